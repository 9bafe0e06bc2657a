//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! execute shell commands, read files, store memories, etc.
//! The registry is the single place where a tool failure becomes a value.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::error::{Error, ToolError};
use crate::provider::ToolDefinition;

/// The result of a tool execution. Always a value, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The output (or the failure description)
    pub text: String,

    /// Whether the invocation failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// The core Tool trait.
///
/// Each tool (shell, file_read, calculate, memory_store, etc.) implements this
/// trait and is registered in the [`ToolRegistry`] before any run starts.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "shell", "file_read").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Run the tool. The context belongs to the calling run only.
    async fn invoke(
        &self,
        arguments: serde_json::Value,
        context: &mut AgentContext,
    ) -> std::result::Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// Registration needs `&mut self`, so once the registry is shared behind an
/// `Arc` its set of names is frozen and dispatch is safe from any number of
/// concurrent runs.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> crate::Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(Error::config(format!("Tool '{name}' is already registered")));
        }
        info!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool schemas, ordered by name.
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Schemas of the tools the given agent may call.
    pub fn definitions_for(&self, agent: &Agent) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .filter(|t| agent.allows(t.name()))
            .map(|t| t.to_definition())
            .collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name with JSON-encoded arguments.
    ///
    /// Unknown names, unparseable arguments, tool errors and panics all come
    /// back as an error-flagged [`ToolResult`].
    pub async fn execute(
        &self,
        name: &str,
        arguments: &str,
        context: &mut AgentContext,
    ) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return ToolResult::error(ToolError::NotFound(name.to_string()).to_string());
        };

        let args = match parse_arguments(arguments) {
            Ok(args) => args,
            Err(reason) => {
                warn!(tool = %name, %reason, "Tool arguments did not parse");
                return ToolResult::error(ToolError::InvalidArguments(reason).to_string());
            }
        };

        if let Err(reason) = check_arguments(&tool.parameters_schema(), &args) {
            warn!(tool = %name, %reason, "Tool arguments did not match schema");
            return ToolResult::error(ToolError::InvalidArguments(reason).to_string());
        }

        debug!(tool = %name, "Invoking tool");
        match AssertUnwindSafe(tool.invoke(args, context))
            .catch_unwind()
            .await
        {
            Ok(Ok(text)) => ToolResult::ok(text),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                ToolResult::error(e.to_string())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!(tool = %name, %reason, "Tool panicked");
                ToolResult::error(
                    ToolError::ExecutionFailed {
                        tool_name: name.to_string(),
                        reason: format!("panicked: {reason}"),
                    }
                    .to_string(),
                )
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the raw argument string. Blank input means "no arguments".
fn parse_arguments(raw: &str) -> std::result::Result<serde_json::Value, String> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw).map_err(|e| format!("arguments are not valid JSON: {e}"))
}

/// Shallow JSON-schema check: object shape, required keys, primitive types.
fn check_arguments(
    schema: &serde_json::Value,
    args: &serde_json::Value,
) -> std::result::Result<(), String> {
    if schema.get("type").and_then(|t| t.as_str()) == Some("object") && !args.is_object() {
        return Err("arguments must be a JSON object".into());
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if args.get(key).is_none() {
                return Err(format!("missing required argument '{key}'"));
            }
        }
    }

    if let (Some(props), Some(values)) = (
        schema.get("properties").and_then(|p| p.as_object()),
        args.as_object(),
    ) {
        for (key, value) in values {
            let Some(expected) = props
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(|t| t.as_str())
            else {
                continue;
            };
            if !matches_type(expected, value) {
                return Err(format!("argument '{key}' must be of type {expected}"));
            }
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &serde_json::Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
