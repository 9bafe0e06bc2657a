//! Channel registry: routes finished responses to their sink.
//!
//! Channels are keyed by id. One id is designated the fallback: responses
//! addressed to an unknown channel go there instead of being dropped.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use turnpike_config::ChannelsConfig;
use turnpike_core::channel::{Channel, ChannelId};
use turnpike_core::error::ChannelError;

use crate::log::LogChannel;
use crate::stdout::StdoutChannel;

/// Central registry holding every response sink.
pub struct ChannelRegistry {
    channels: HashMap<ChannelId, Arc<dyn Channel>>,
    fallback: Option<ChannelId>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    /// Create an empty registry with no fallback.
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            fallback: None,
        }
    }

    /// The built-in `log` and `stdout` channels, with the configured fallback.
    pub fn from_config(config: &ChannelsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LogChannel::new()));
        registry.register(Arc::new(StdoutChannel::new()));
        registry.set_fallback(config.fallback.as_str());
        registry
    }

    /// Register a channel. A channel with the same id is replaced.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let id = channel.id().clone();
        info!(channel = %id, "Registered channel");
        if self.channels.insert(id.clone(), channel).is_some() {
            warn!(channel = %id, "Replaced existing channel");
        }
    }

    /// Designate the fallback channel. It does not have to be registered yet.
    pub fn set_fallback(&mut self, id: impl Into<ChannelId>) {
        self.fallback = Some(id.into());
    }

    pub fn with_fallback(mut self, id: impl Into<ChannelId>) -> Self {
        self.set_fallback(id);
        self
    }

    pub fn fallback(&self) -> Option<&ChannelId> {
        self.fallback.as_ref()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Channel>> {
        self.channels.get(&ChannelId::from(id))
    }

    /// Registered channel ids, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.channels.keys().map(ChannelId::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The channel a response for `id` would be delivered to.
    pub fn route(&self, id: &str) -> Option<&Arc<dyn Channel>> {
        self.get(id).or_else(|| {
            self.fallback
                .as_ref()
                .and_then(|fallback| self.channels.get(fallback))
        })
    }

    /// Deliver `content` to channel `id`, or to the fallback if `id` is unknown.
    pub async fn deliver(&self, id: &str, target: &str, content: &str) -> Result<(), ChannelError> {
        let Some(channel) = self.route(id) else {
            return Err(ChannelError::NotConfigured(format!(
                "Channel '{id}' not found and no fallback is registered"
            )));
        };

        if channel.id().as_str() != id {
            debug!(requested = %id, fallback = %channel.id(), "Routing to fallback channel");
        }
        channel.deliver(target, content).await
    }

    /// Run health checks on all channels.
    pub async fn health_check_all(&self) -> HashMap<String, bool> {
        let mut results = HashMap::new();
        for (id, channel) in &self.channels {
            let healthy = channel.health_check().await.unwrap_or(false);
            results.insert(id.to_string(), healthy);
        }
        results
    }
}
