//! # Turnpike Core
//!
//! Domain types, traits, and error definitions for the Turnpike orchestration
//! engine. This crate has **no framework dependencies**: it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external actor (model provider, tool, memory store, response
//! channel) is a trait here. Implementations live in their respective crates
//! or are supplied by collaborators. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod channel;
pub mod context;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod response;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, AgentHandle};
pub use channel::{Channel, ChannelId};
pub use context::AgentContext;
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use memory::{MemoryRecord, MemoryStore};
pub use message::{ChatMessage, Role, ToolCallRequest};
pub use provider::{Provider, ProviderKind, ProviderRequest, ProviderResponse, StreamChunk};
pub use response::{AgentResponse, RunOutcome};
pub use tool::{Tool, ToolRegistry, ToolResult};
