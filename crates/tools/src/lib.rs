//! Built-in tool implementations for Turnpike.
//!
//! Tools give the agent the ability to act: run allowlisted shell commands,
//! read files, do arithmetic, remember facts, and set context variables.

pub mod calculator;
pub mod file_read;
pub mod memory;
pub mod shell;
pub mod variables;

use std::sync::Arc;
use std::time::Duration;

use turnpike_config::ToolsConfig;
use turnpike_core::error::Result;
use turnpike_core::memory::MemoryStore;
use turnpike_core::tool::ToolRegistry;

pub use memory::InMemoryStore;

/// Create a registry holding every built-in tool.
///
/// Memory tools share `memory`; the shell allowlist, shell timeout and
/// file-read roots come from `config`.
pub fn default_registry(config: &ToolsConfig, memory: Arc<dyn MemoryStore>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(calculator::CalculatorTool))?;
    registry.register(Box::new(shell::ShellTool::new(
        config.shell_allowed_commands.clone(),
        Duration::from_secs(config.shell_timeout_secs),
    )))?;
    registry.register(Box::new(file_read::FileReadTool::with_roots(
        config.file_read_roots.iter().cloned(),
    )))?;
    registry.register(Box::new(memory::MemoryStoreTool::new(memory.clone())))?;
    registry.register(Box::new(memory::MemoryRecallTool::new(memory.clone())))?;
    registry.register(Box::new(memory::MemoryForgetTool::new(memory.clone())))?;
    registry.register(Box::new(memory::MemoryListTool::new(memory)))?;
    registry.register(Box::new(variables::SetVariableTool))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnpike_core::context::AgentContext;

    fn registry() -> ToolRegistry {
        default_registry(&ToolsConfig::default(), Arc::new(InMemoryStore::new())).unwrap()
    }

    #[test]
    fn registers_every_builtin() {
        let registry = registry();
        assert_eq!(
            registry.names(),
            vec![
                "calculate",
                "file_read",
                "memory_forget",
                "memory_list",
                "memory_recall",
                "memory_store",
                "set_variable",
                "shell",
            ]
        );
        assert!(registry.list().iter().all(|d| d.parameters["type"] == "object"));
    }

    #[tokio::test]
    async fn registry_dispatches_calculate() {
        let mut ctx = AgentContext::new();
        let result = registry()
            .execute("calculate", r#"{"expr":"2+2"}"#, &mut ctx)
            .await;
        assert!(!result.is_error);
        assert_eq!(result.text, "4");
    }

    #[tokio::test]
    async fn schema_mismatch_is_an_error_result() {
        let mut ctx = AgentContext::new();
        let result = registry()
            .execute("calculate", r#"{"expr": 4}"#, &mut ctx)
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("expr"));
    }
}
