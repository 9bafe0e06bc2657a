//! Stdout channel: prints responses to the terminal.
//!
//! Used by the `turnpike` binary and handy for local drivers.

use async_trait::async_trait;
use tokio::io::{self, AsyncWriteExt};
use tracing::debug;
use turnpike_core::channel::{Channel, ChannelId};
use turnpike_core::error::ChannelError;

/// Writes each delivered response to stdout, one per line.
pub struct StdoutChannel {
    id: ChannelId,
}

impl StdoutChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("stdout".into()),
        }
    }
}

impl Default for StdoutChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for StdoutChannel {
    fn name(&self) -> &str {
        "stdout"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn deliver(&self, target: &str, content: &str) -> Result<(), ChannelError> {
        debug!(channel = "stdout", target = %target, bytes = content.len(), "Delivering response");

        let mut out = io::stdout();
        let line = format!("{content}\n");
        let written = match out.write_all(line.as_bytes()).await {
            Ok(()) => out.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| ChannelError::DeliveryFailed {
            channel: self.name().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_channel_properties() {
        let ch = StdoutChannel::new();
        assert_eq!(ch.name(), "stdout");
        assert_eq!(ch.id().as_str(), "stdout");
    }

    #[tokio::test]
    async fn delivers_and_reports_healthy() {
        let ch = StdoutChannel::default();
        ch.deliver("session-1", "hello from the test").await.unwrap();
        assert!(ch.health_check().await.unwrap());
    }
}
