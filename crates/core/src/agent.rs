//! Agent descriptor and its live, swappable configuration slot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Tool name that grants an agent every registered tool.
pub const ALL_TOOLS: &str = "*";

/// An immutable agent descriptor.
///
/// Changing an agent means building a new value and publishing it through an
/// [`AgentHandle`]; fields are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Display name
    name: String,

    /// Model specification handed to the provider router
    model: String,

    /// System instructions, sent as the first message of every run
    instructions: String,

    /// Names of the tools this agent may call
    tools: BTreeSet<String>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
        tools: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: instructions.into(),
            tools: tools.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &BTreeSet<String> {
        &self.tools
    }

    /// Whether this agent may invoke the named tool.
    pub fn allows(&self, tool_name: &str) -> bool {
        self.tools.contains(ALL_TOOLS) || self.tools.contains(tool_name)
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new(
            "assistant",
            "",
            "You are a helpful assistant. Use the available tools when they help answer the request.",
            [ALL_TOOLS],
        )
    }
}

/// Holds the currently active agent and lets an administrator replace it.
///
/// Readers always get a complete, consistent `Agent`; a run that took a
/// snapshot is unaffected by later publications.
#[derive(Debug)]
pub struct AgentHandle {
    current: RwLock<Arc<Agent>>,
}

impl AgentHandle {
    pub fn new(agent: Agent) -> Self {
        Self {
            current: RwLock::new(Arc::new(agent)),
        }
    }

    /// The agent as of now.
    pub fn snapshot(&self) -> Arc<Agent> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the active agent wholesale. Returns the previous snapshot.
    pub fn publish(&self, agent: Agent) -> Arc<Agent> {
        info!(agent = %agent.name(), model = %agent.model(), "Publishing agent configuration");
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(agent))
    }
}

impl Default for AgentHandle {
    fn default() -> Self {
        Self::new(Agent::default())
    }
}
