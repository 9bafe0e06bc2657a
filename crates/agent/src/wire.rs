//! Request/response bodies exchanged with transport adapters.
//!
//! ```json
//! { "messages": [{"role": "user", "content": "2+2?"}],
//!   "contextVariables": {"tz": "UTC"},
//!   "maxTurns": 5 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use turnpike_config::EngineLimits;
use turnpike_core::context::AgentContext;
use turnpike_core::error::ValidationError;
use turnpike_core::message::{ChatMessage, Role};
use turnpike_core::response::AgentResponse;

/// One message as transports send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

impl WireMessage {
    pub fn into_message(self) -> Result<ChatMessage, ValidationError> {
        let content = self.content;
        Ok(match Role::from_wire(&self.role)? {
            Role::User => ChatMessage::user(content),
            Role::Assistant => ChatMessage::assistant(content),
            // Tool output replayed by a transport has no request id to match.
            Role::Tool => ChatMessage::tool_result("", content, false),
            Role::System => return Err(ValidationError::UnsupportedRole(self.role)),
        })
    }
}

/// Serialize a transcript into wire messages, preserving order.
///
/// System instructions belong to the agent rather than the conversation and
/// are left out, so the result is always accepted by [`ChatRequest::validate`].
pub fn to_wire(messages: &[ChatMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(WireMessage::from)
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,

    #[serde(default)]
    pub context_variables: HashMap<String, String>,

    /// Omitted means the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
}

/// A request that passed validation, ready for [`crate::Engine::run`].
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub messages: Vec<ChatMessage>,
    pub context: AgentContext,
    pub max_turns: u32,
}

impl ChatRequest {
    /// Reject empty or oversized message lists, unknown roles and a zero
    /// turn budget. Budgets above the ceiling are clamped.
    pub fn validate(self, limits: &EngineLimits) -> Result<ValidatedRequest, ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::EmptyMessages);
        }
        if self.messages.len() > limits.max_messages {
            return Err(ValidationError::TooManyMessages {
                count: self.messages.len(),
                max: limits.max_messages,
            });
        }

        let max_turns = match self.max_turns {
            None => limits.default_max_turns,
            Some(0) => return Err(ValidationError::InvalidMaxTurns(0)),
            Some(n) => n.min(limits.max_turns_ceiling),
        };

        let messages = self
            .messages
            .into_iter()
            .map(WireMessage::into_message)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedRequest {
            messages,
            context: AgentContext::new().with_variables(self.context_variables),
            max_turns,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub agent: String,
    #[serde(default)]
    pub truncated: bool,
}

impl From<&AgentResponse> for ChatResponse {
    fn from(run: &AgentResponse) -> Self {
        Self {
            response: run.final_text().to_string(),
            agent: run.agent.name().to_string(),
            truncated: run.is_truncated(),
        }
    }
}
