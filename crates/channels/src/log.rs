//! Log channel: records responses as tracing events.
//!
//! The default fallback: a response addressed to a channel nobody registered
//! still ends up somewhere an operator can find it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use turnpike_core::channel::{Channel, ChannelId};
use turnpike_core::error::ChannelError;

pub struct LogChannel {
    id: ChannelId,
    delivered: AtomicU64,
}

impl LogChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("log".into()),
            delivered: AtomicU64::new(0),
        }
    }

    /// Responses recorded so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn deliver(&self, target: &str, content: &str) -> Result<(), ChannelError> {
        info!(channel = "log", target = %target, content = %content, "Response delivered");
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
