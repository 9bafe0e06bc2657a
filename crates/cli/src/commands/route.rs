//! `turnpike route`: Resolve a model spec against the configured providers.

use std::path::Path;

use turnpike_config::AppConfig;
use turnpike_providers::RoutingTable;

pub async fn run(config_path: Option<&Path>, spec: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    println!("{}", describe(&config, spec)?);
    Ok(())
}

/// One-line summary of where `spec` goes.
pub fn describe(config: &AppConfig, spec: &str) -> turnpike_core::Result<String> {
    let table = RoutingTable::from_config(config)?;
    let route = table.resolve(spec);
    let kind = table
        .entry(&route.provider_id)
        .map(|entry| entry.kind.to_string())
        .unwrap_or_default();

    let shown = if spec.trim().is_empty() { "<default>" } else { spec.trim() };
    Ok(format!(
        "{shown} -> provider: {} ({kind}), model: {}",
        route.provider_id, route.model
    ))
}
