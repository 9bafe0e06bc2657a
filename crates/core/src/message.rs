//! Chat message domain types.
//!
//! These are the core value objects that flow through a run:
//! caller supplies messages → engine sends them to the provider →
//! provider answers (optionally requesting tools) → tool results are appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Agent instructions. Only the engine produces these.
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Tool execution result
    Tool,
}

impl Role {
    /// Parse a role as accepted at the transport boundary.
    ///
    /// Only `user`, `assistant` and `tool` are accepted; `system` is reserved
    /// for the agent's own instructions.
    pub fn from_wire(value: &str) -> Result<Self, ValidationError> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(ValidationError::UnsupportedRole(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool invocation requested by the model inside an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON string
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A single message in a conversation.
///
/// Messages are never mutated once they are part of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    #[serde(default = "new_message_id")]
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Display name of the sender, if the channel knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Set on tool results produced from a failed invocation
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.into(),
            sender_name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create an assistant message carrying tool call requests.
    pub fn assistant_with_tools(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        let mut msg = Self::with_role(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg.is_error = is_error;
        msg
    }

    /// Attach a sender display name.
    pub fn with_sender(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Whether the assistant asked for at least one tool.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = ChatMessage::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, agent!");
        assert!(msg.tool_calls.is_empty());
        assert!(!msg.is_error);
    }

    #[test]
    fn tool_result_references_call() {
        let msg = ChatMessage::tool_result("call_7", "boom", true);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
        assert!(msg.is_error);
    }

    #[test]
    fn wire_roles() {
        assert_eq!(Role::from_wire("user").unwrap(), Role::User);
        assert_eq!(Role::from_wire("assistant").unwrap(), Role::Assistant);
        assert_eq!(Role::from_wire("tool").unwrap(), Role::Tool);
        assert_eq!(
            Role::from_wire("system").unwrap_err(),
            ValidationError::UnsupportedRole("system".into())
        );
        assert!(Role::from_wire("User").is_err());
    }

    #[test]
    fn serialization_keeps_role_content_and_order() {
        let history = vec![
            ChatMessage::user("2+2?"),
            ChatMessage::assistant_with_tools(
                "",
                vec![ToolCallRequest::new("c1", "calculate", r#"{"expr":"2+2"}"#)],
            ),
            ChatMessage::tool_result("c1", "4", false),
            ChatMessage::assistant("4").with_sender("helper"),
        ];
        let json = serde_json::to_string(&history).unwrap();
        let parsed: Vec<ChatMessage> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.len(), history.len());
        for (a, b) in history.iter().zip(&parsed) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.content, b.content);
            assert_eq!(a.tool_calls, b.tool_calls);
            assert_eq!(a.tool_call_id, b.tool_call_id);
        }
        assert_eq!(parsed[3].sender_name.as_deref(), Some("helper"));
    }

    #[test]
    fn minimal_wire_message_deserializes() {
        let msg: ChatMessage = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn error_flag_is_omitted_when_false() {
        let json = serde_json::to_string(&ChatMessage::tool_result("c", "ok", false)).unwrap();
        assert!(!json.contains("is_error"));
        let json = serde_json::to_string(&ChatMessage::tool_result("c", "bad", true)).unwrap();
        assert!(json.contains(r#""is_error":true"#));
    }
}
