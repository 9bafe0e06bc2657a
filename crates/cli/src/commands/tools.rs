//! `turnpike tools`: List the built-in tools.

use std::path::Path;
use std::sync::Arc;

use turnpike_core::tool::ToolRegistry;
use turnpike_tools::{InMemoryStore, default_registry};

pub async fn run(config_path: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let registry = default_registry(&config.tools, Arc::new(InMemoryStore::new()))?;
    println!("{}", render(&registry, json)?);
    Ok(())
}

pub fn render(registry: &ToolRegistry, json: bool) -> Result<String, serde_json::Error> {
    let definitions = registry.list();
    if json {
        return serde_json::to_string_pretty(&definitions);
    }

    let width = definitions.iter().map(|d| d.name.len()).max().unwrap_or(0);
    let mut out = format!("{} built-in tools\n", definitions.len());
    for def in &definitions {
        out.push_str(&format!("\n  {:<width$}  {}", def.name, def.description));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnpike_config::ToolsConfig;

    fn registry() -> ToolRegistry {
        default_registry(&ToolsConfig::default(), Arc::new(InMemoryStore::new())).unwrap()
    }

    #[test]
    fn summary_lists_every_tool() {
        let text = render(&registry(), false).unwrap();
        assert!(text.starts_with("8 built-in tools"));
        for name in ["calculate", "shell", "file_read", "set_variable"] {
            assert!(text.contains(name), "missing {name}");
        }
    }

    #[test]
    fn json_output_is_schema_list() {
        let text = render(&registry(), true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let tools = parsed.as_array().unwrap();
        assert_eq!(tools.len(), 8);
        assert!(tools.iter().all(|t| t["parameters"]["type"] == "object"));
    }
}
