//! `turnpike config`: Configuration management commands.

use std::path::Path;

use turnpike_channels::ChannelRegistry;
use turnpike_config::AppConfig;
use turnpike_providers::RoutingTable;

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match super::load_config(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Agent:     {}", config.agent.name);
            println!("   Model:     {}", config.agent.model);
            if let Ok(table) = RoutingTable::from_config(&config) {
                let route = table.resolve(&config.agent.model);
                println!("   Routes to: {} ({})", route.provider_id, route.model);
            }
            println!("   Providers: {}", config.providers.len());
            println!(
                "   Turns:     {} (ceiling {})",
                config.engine.max_turns, config.engine.max_turns_ceiling
            );
            println!("   Fallback:  {}", config.channels.fallback);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Problems that do not stop the config from loading but will bite at run time.
pub fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if RoutingTable::from_config(config).is_err() {
        warnings.push("No providers configured under [providers]".to_string());
    }

    if config.agent.tools.is_empty() {
        warnings.push("agent.tools is empty; the agent cannot call any tool".to_string());
    }

    if config.tools.shell_allowed_commands.is_empty() {
        warnings.push("tools.shell_allowed_commands is empty; the shell tool denies everything".to_string());
    }

    let channels = ChannelRegistry::from_config(&config.channels);
    if channels.get(&config.channels.fallback).is_none() {
        warnings.push(format!(
            "channels.fallback '{}' is not a built-in channel ({})",
            config.channels.fallback,
            channels.list().join(", ")
        ));
    }

    warnings
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", super::config_path(config_path).display());
    Ok(())
}
