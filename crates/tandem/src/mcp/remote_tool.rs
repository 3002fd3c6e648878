use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::{McpClient, RemoteTool};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;
use crate::tools::{AgentTool, ParameterType, ToolParameter, ToolResult};

/// One qualified remote tool exposed directly to the model
pub struct McpTool {
    client: Arc<McpClient>,
    remote: RemoteTool,
    parameters: Vec<ToolParameter>,
}

impl McpTool {
    pub fn new(client: Arc<McpClient>, remote: RemoteTool) -> Self {
        let parameters = parameters_from_schema(&remote.input_schema);
        Self {
            client,
            remote,
            parameters,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.remote.server_name
    }
}

/// Flatten the top level of a JSON schema into declared parameters
pub fn parameters_from_schema(schema: &Value) -> Vec<ToolParameter> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    properties
        .iter()
        .map(|(name, property)| ToolParameter {
            name: name.clone(),
            kind: property
                .get("type")
                .and_then(Value::as_str)
                .and_then(|t| ParameterType::from_str(t).ok())
                .unwrap_or(ParameterType::String),
            description: property
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            required: required.contains(&name.as_str()),
            default: property.get("default").cloned(),
        })
        .collect()
}

#[async_trait]
impl AgentTool for McpTool {
    fn name(&self) -> &str {
        &self.remote.name
    }

    fn description(&self) -> &str {
        &self.remote.description
    }

    fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    /// The server's own schema, nested structure included
    fn schema(&self) -> Tool {
        self.remote.to_tool()
    }

    async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
        let result = self
            .client
            .call_tool(&self.remote.name, arguments)
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        let text = result.text();
        let outcome = if result.is_error {
            ToolResult::failure(text)
        } else {
            ToolResult::success(text)
        };
        Ok(outcome
            .with_meta("server", json!(self.remote.server_name))
            .with_meta("tool", json!(self.remote.raw_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_from_schema() {
        let parameters = parameters_from_schema(&json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Where to go"},
                "timeout": {"type": "integer", "default": 30000},
                "options": {"type": ["object", "null"]}
            },
            "required": ["url"]
        }));
        assert_eq!(parameters.len(), 3);
        let url = parameters.iter().find(|p| p.name == "url").unwrap();
        assert!(url.required);
        assert_eq!(url.description, "Where to go");
        let timeout = parameters.iter().find(|p| p.name == "timeout").unwrap();
        assert_eq!(timeout.kind, ParameterType::Integer);
        assert_eq!(timeout.default, Some(json!(30000)));
        let options = parameters.iter().find(|p| p.name == "options").unwrap();
        assert_eq!(options.kind, ParameterType::String);
    }

    #[tokio::test]
    async fn test_unconnected_tool_fails_cleanly() {
        let client = Arc::new(McpClient::default());
        let tool = McpTool::new(
            client,
            RemoteTool {
                name: "stub_echo".to_string(),
                raw_name: "echo".to_string(),
                description: "Echo".to_string(),
                input_schema: json!({"type": "object", "properties": {}}),
                server_name: "stub".to_string(),
            },
        );
        assert_eq!(tool.schema().name, "stub_echo");
        let error = tool.execute(json!({})).await.unwrap_err();
        assert_eq!(
            error,
            AgentError::ExecutionError("Tool 'stub_echo' not found".to_string())
        );
    }
}
