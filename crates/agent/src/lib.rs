//! The Turnpike engine: a bounded turn loop between a model and its tools.
//!
//! A run follows a **call → dispatch → call** cycle:
//!
//! 1. **Seed** the transcript with the agent's instructions and the caller's messages
//! 2. **Call** the model resolved for the agent's model spec
//! 3. **If tool calls**: run them in order, append each result, count one turn
//! 4. **If text only**: the run is complete
//!
//! The loop also stops when the turn budget is spent, in which case the run
//! is reported as truncated rather than failed.

pub mod engine;
pub mod stream_event;
pub mod wire;

#[cfg(test)]
mod test_helpers;

pub use engine::{Engine, EngineBuilder};
pub use stream_event::AgentStreamEvent;
pub use wire::{ChatRequest, ChatResponse, ValidatedRequest, WireMessage, to_wire};
