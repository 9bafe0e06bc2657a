//! Domain event system: lets collaborators observe runs without coupling.
//!
//! The engine publishes events as a run progresses. Subscribers (audit logs,
//! usage meters, dashboards) filter for what they care about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::response::RunOutcome;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A run passed validation and is about to call the model
    RunStarted {
        run_id: String,
        agent: String,
        max_turns: u32,
        timestamp: DateTime<Utc>,
    },

    /// A model call returned
    ProviderCalled {
        run_id: String,
        provider_id: String,
        model: String,
        tokens_used: Option<u32>,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        run_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run reached a terminal state (not emitted on provider failure)
    RunFinished {
        run_id: String,
        outcome: RunOutcome,
        turns: u32,
        provider_calls: u32,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ToolExecuted {
            run_id: "r1".into(),
            tool_name: "shell".into(),
            success: true,
            duration_ms: 42,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolExecuted {
                tool_name, success, ..
            } => {
                assert_eq!(tool_name, "shell");
                assert!(success);
            }
            _ => panic!("Expected ToolExecuted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::RunFinished {
            run_id: "r1".into(),
            outcome: RunOutcome::Completed,
            turns: 0,
            provider_calls: 1,
            timestamp: Utc::now(),
        });
    }
}
