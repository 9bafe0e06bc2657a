//! `set_variable`: write a key/value into the calling run's context.

use async_trait::async_trait;
use turnpike_core::context::AgentContext;
use turnpike_core::error::ToolError;
use turnpike_core::tool::Tool;

pub struct SetVariableTool;

#[async_trait]
impl Tool for SetVariableTool {
    fn name(&self) -> &str {
        "set_variable"
    }

    fn description(&self) -> &str {
        "Set a conversation variable that the caller receives back when the run ends."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Variable name" },
                "value": { "type": "string", "description": "Variable value" }
            },
            "required": ["name", "value"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        context: &mut AgentContext,
    ) -> Result<String, ToolError> {
        let name = arguments["name"]
            .as_str()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'name' argument".into()))?;
        let value = arguments["value"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'value' argument".into()))?;

        Ok(match context.set_variable(name, value) {
            Some(previous) => format!("{name} = {value} (was {previous})"),
            None => format!("{name} = {value}"),
        })
    }
}
