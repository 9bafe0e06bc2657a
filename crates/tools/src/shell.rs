//! Shell tool: run an allowlisted command with its own time limit.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use turnpike_core::context::AgentContext;
use turnpike_core::error::ToolError;
use turnpike_core::tool::Tool;

/// Chaining, substitution, redirection and line breaks.
const SHELL_OPERATORS: &[char] = &[';', '&', '|', '`', '>', '<', '\n', '\r'];

/// Execute shell commands with safety constraints.
pub struct ShellTool {
    /// Only these base commands may run. Empty denies everything.
    allowed_commands: Vec<String>,
    timeout: Duration,
}

impl ShellTool {
    pub fn new(allowed_commands: Vec<String>, timeout: Duration) -> Self {
        Self {
            allowed_commands,
            timeout,
        }
    }

    fn base_command(command: &str) -> &str {
        command.split_whitespace().next().unwrap_or("")
    }

    /// `sh -c` would run anything chained after the allowlisted word.
    fn has_shell_operator(command: &str) -> bool {
        command.contains(SHELL_OPERATORS) || command.contains("$(")
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        let base = Self::base_command(command);
        !base.is_empty() && self.allowed_commands.iter().any(|a| a == base)
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output. Only allowlisted commands may run."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _context: &mut AgentContext,
    ) -> Result<String, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        if Self::has_shell_operator(command) {
            warn!(command = %command, "Rejected shell operator");
            return Err(ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: "shell operators are not allowed".into(),
            });
        }

        if !self.is_command_allowed(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: format!(
                    "Command '{}' not in allowlist",
                    Self::base_command(command)
                ),
            });
        }

        debug!(command = %command, timeout_secs = self.timeout.as_secs(), "Executing shell command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        // A timed-out child is killed when its handle drops.
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                warn!(command = %command, "Shell command timed out");
                ToolError::Timeout {
                    tool_name: self.name().into(),
                    timeout_secs: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("exit code {code}: {}", stderr.trim()),
            });
        }

        let text = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            format!("{}\n[stderr]: {}", stdout.trim(), stderr.trim())
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(allowed: &[&str]) -> ShellTool {
        ShellTool::new(
            allowed.iter().map(|s| s.to_string()).collect(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn allowlist_check() {
        let tool = tool(&["ls", "cat", "git"]);
        assert!(tool.is_command_allowed("ls -la"));
        assert!(tool.is_command_allowed("git status"));
        assert!(!tool.is_command_allowed("rm -rf /"));
        assert!(!tool.is_command_allowed("   "));
    }

    #[test]
    fn empty_allowlist_denies_all() {
        assert!(!tool(&[]).is_command_allowed("echo hi"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_allowed_command() {
        let mut ctx = AgentContext::new();
        let out = tool(&["echo"])
            .invoke(serde_json::json!({"command": "echo hello"}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn blocked_command() {
        let mut ctx = AgentContext::new();
        let result = tool(&["ls"])
            .invoke(serde_json::json!({"command": "rm -rf /"}), &mut ctx)
            .await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn chained_commands_are_denied() {
        let mut ctx = AgentContext::new();
        let tool = tool(&["echo", "ls"]);
        for command in [
            "echo hi; ls",
            "echo hi | ls",
            "echo hi || ls",
            "echo $(id)",
            "echo `id`",
            "echo hi > out.txt",
            "echo hi\nls",
        ] {
            let result = tool
                .invoke(serde_json::json!({ "command": command }), &mut ctx)
                .await;
            match result {
                Err(ToolError::PermissionDenied { reason, .. }) => {
                    assert_eq!(reason, "shell operators are not allowed", "{command}")
                }
                other => panic!("{command}: expected denial, got {other:?}"),
            }
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn chained_command_never_runs() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let mut ctx = AgentContext::new();
        let command = format!("echo hi && touch {}", marker.display());
        let result = tool(&["echo"])
            .invoke(serde_json::json!({ "command": command }), &mut ctx)
            .await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let mut ctx = AgentContext::new();
        let result = tool(&["false"])
            .invoke(serde_json::json!({"command": "false"}), &mut ctx)
            .await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let mut ctx = AgentContext::new();
        let tool = ShellTool::new(vec!["sleep".into()], Duration::from_millis(100));
        let result = tool
            .invoke(serde_json::json!({"command": "sleep 5"}), &mut ctx)
            .await;
        assert!(matches!(result, Err(ToolError::Timeout { .. })));
    }
}
