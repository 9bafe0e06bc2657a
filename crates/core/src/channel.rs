//! Channel trait: where finished responses go.
//!
//! A Channel is a sink owned by a transport collaborator (chat reply,
//! scheduled-task log, terminal). Channels are looked up by id in a registry
//! with one designated fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The core Channel trait.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "log", "stdout", "telegram").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Deliver a response to a target within the channel (chat id, task name).
    async fn deliver(&self, target: &str, content: &str) -> std::result::Result<(), ChannelError>;

    /// Health check: is the channel operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}
