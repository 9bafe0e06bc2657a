//! Events emitted by a streaming run.
//!
//! A streaming run forwards model text as it arrives and reports tool
//! activity between model calls. The sequence always ends with exactly one
//! `done` or `error` event, unless the consumer hangs up first.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use turnpike_core::response::RunOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text from the model.
    Chunk { content: String },

    /// The model asked for a tool; dispatch follows.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// A tool finished (or was refused).
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// The run reached a terminal state.
    Done {
        outcome: RunOutcome,
        turns: u32,
        provider_calls: u32,
        variables: HashMap<String, String>,
    },

    /// The run failed. Nothing follows.
    Error { message: String },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
