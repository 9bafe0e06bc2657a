//! File read tool: read a UTF-8 file, optionally confined to allowed roots.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use turnpike_core::context::AgentContext;
use turnpike_core::error::ToolError;
use turnpike_core::tool::Tool;

pub struct FileReadTool {
    /// Allowed root directories. Empty = allow all.
    allowed_roots: Vec<PathBuf>,
}

impl FileReadTool {
    /// Create a file read tool with no path restrictions.
    pub fn new() -> Self {
        Self {
            allowed_roots: Vec::new(),
        }
    }

    pub fn with_roots(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            allowed_roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    fn check_path(&self, path: &Path) -> Result<(), String> {
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err("path must not contain '..'".into());
        }
        if self.allowed_roots.is_empty() {
            return Ok(());
        }
        if !path.is_absolute() {
            return Err("path must be absolute when roots are restricted".into());
        }
        if self.allowed_roots.iter().any(|root| path.starts_with(root)) {
            Ok(())
        } else {
            Err(format!("{} is outside the allowed roots", path.display()))
        }
    }

    /// Resolve symlinks and re-check the real path against the real roots.
    /// Returns the path to read.
    async fn resolve(&self, path: &Path) -> Result<PathBuf, ToolError> {
        if self.allowed_roots.is_empty() {
            return Ok(path.to_path_buf());
        }
        let real = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("Failed to read {}: {e}", path.display()),
            })?;
        for root in &self.allowed_roots {
            // A root that does not exist cannot contain anything.
            if let Ok(real_root) = tokio::fs::canonicalize(root).await
                && real.starts_with(&real_root)
            {
                return Ok(real);
            }
        }
        warn!(path = %path.display(), resolved = %real.display(), "Path resolves outside allowed roots");
        Err(ToolError::PermissionDenied {
            tool_name: self.name().into(),
            reason: format!("{} resolves outside the allowed roots", path.display()),
        })
    }
}

impl Default for FileReadTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file at the given path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _context: &mut AgentContext,
    ) -> Result<String, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let path = Path::new(path);

        self.check_path(path)
            .map_err(|reason| ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason,
            })?;
        let real = self.resolve(path).await?;

        tokio::fs::read_to_string(&real)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("Failed to read {}: {e}", path.display()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("notes.txt");
        std::fs::write(&file_path, "Hello, world!\n").unwrap();

        let mut ctx = AgentContext::new();
        let out = FileReadTool::with_roots([dir.path()])
            .invoke(serde_json::json!({"path": file_path.to_str().unwrap()}), &mut ctx)
            .await
            .unwrap();
        assert!(out.contains("Hello, world!"));
    }

    #[tokio::test]
    async fn read_nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let mut ctx = AgentContext::new();
        let err = FileReadTool::new()
            .invoke(serde_json::json!({"path": missing.to_str().unwrap()}), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn outside_roots_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let target = other.path().join("secret.txt");
        std::fs::write(&target, "no").unwrap();

        let mut ctx = AgentContext::new();
        let result = FileReadTool::with_roots([dir.path()])
            .invoke(serde_json::json!({"path": target.to_str().unwrap()}), &mut ctx)
            .await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_out_of_root_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let secret = other.path().join("secret.txt");
        std::fs::write(&secret, "top secret").unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&secret, &link).unwrap();

        let mut ctx = AgentContext::new();
        let result = FileReadTool::with_roots([dir.path()])
            .invoke(serde_json::json!({"path": link.to_str().unwrap()}), &mut ctx)
            .await;
        match result {
            Err(ToolError::PermissionDenied { reason, .. }) => {
                assert!(reason.contains("outside the allowed roots"))
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_within_root_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real.txt");
        std::fs::write(&target, "inside").unwrap();
        let link = dir.path().join("alias.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let mut ctx = AgentContext::new();
        let out = FileReadTool::with_roots([dir.path()])
            .invoke(serde_json::json!({"path": link.to_str().unwrap()}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, "inside");
    }

    #[tokio::test]
    async fn path_traversal_blocked() {
        let mut ctx = AgentContext::new();
        let result = FileReadTool::new()
            .invoke(serde_json::json!({"path": "../../../etc/passwd"}), &mut ctx)
            .await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }
}
