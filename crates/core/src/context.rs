//! Per-run conversation context.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::message::ChatMessage;

/// Caller-scoped state threaded through exactly one run.
///
/// The caller owns it: the engine mutates it in place during the run and
/// hands it back afterwards. It is never shared between concurrent runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentContext {
    /// Optional session identifier supplied by the channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Caller-supplied key/value variables
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Ordered message history of the current run
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl AgentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to a session.
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    /// Seed variables (builder style).
    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Set a variable, returning the previous value.
    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.variables.insert(key.into(), value.into())
    }
}
