//! Capabilities the agent can invoke on a model's behalf.
//!
//! Every tool, local or backed by a remote provider process, implements
//! [`AgentTool`]: it declares its parameters explicitly, validates the
//! arguments a model sends, and produces a uniform [`ToolResult`].

pub mod code_execution;
pub mod exa;
pub mod process;
pub mod terminal;
pub mod web_content;
pub mod web_search;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use strum_macros::{Display, EnumString};

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

pub use code_execution::CodeExecutionTool;
pub use terminal::TerminalTool;
pub use web_content::WebContentTool;
pub use web_search::WebSearchTool;

/// JSON schema type of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParameterType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
}

impl ToolParameter {
    pub fn required<N: Into<String>, D: Into<String>>(
        name: N,
        kind: ParameterType,
        description: D,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    pub fn optional<N: Into<String>, D: Into<String>>(
        name: N,
        kind: ParameterType,
        description: D,
        default: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default,
        }
    }
}

/// Outcome of one tool execution.
///
/// A failed result never carries content and always carries an error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ToolResult {
    pub fn success<S: Into<String>>(content: S) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: None,
            metadata: None,
        }
    }

    pub fn failure<S: Into<String>>(error: S) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "Unknown error".to_string();
        }
        Self {
            success: false,
            content: String::new(),
            error: Some(error),
            metadata: None,
        }
    }

    /// Attach one metadata entry
    pub fn with_meta<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Text handed back to the model in the tool message
    pub fn to_model_text(&self) -> String {
        if self.success {
            self.content.clone()
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("Unknown error"))
        }
    }
}

impl From<AgentError> for ToolResult {
    fn from(error: AgentError) -> Self {
        ToolResult::failure(error.to_string())
    }
}

/// Core trait every tool the agent can call implements
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Name the model uses to call this tool, unique within one agent
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Declared parameters, in the order they are presented to the model
    fn parameters(&self) -> &[ToolParameter];

    /// The agent-level schema handed to model adapters
    fn schema(&self) -> Tool {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in self.parameters() {
            let mut property = json!({
                "type": param.kind.to_string(),
                "description": param.description,
            });
            if let (Some(default), Some(object)) = (&param.default, property.as_object_mut()) {
                object.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), property);
            if param.required {
                required.push(param.name.clone());
            }
        }
        Tool::new(
            self.name(),
            self.description(),
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        )
    }

    /// Check that every declared-required parameter is present
    fn validate(&self, arguments: &Value) -> AgentResult<()> {
        let object = arguments.as_object().ok_or_else(|| {
            AgentError::InvalidParameters("Arguments must be a JSON object".to_string())
        })?;
        for param in self.parameters().iter().filter(|p| p.required) {
            match object.get(&param.name) {
                None | Some(Value::Null) => {
                    return Err(AgentError::InvalidParameters(format!(
                        "Required parameter '{}' is missing",
                        param.name
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    async fn execute(&self, arguments: Value) -> AgentResult<ToolResult>;

    /// Release anything the tool holds; must be safe to call repeatedly
    async fn cleanup(&self) {}
}

pub fn str_arg<'a>(arguments: &'a Value, name: &str) -> Option<&'a str> {
    arguments.get(name).and_then(Value::as_str)
}

pub fn require_str<'a>(arguments: &'a Value, name: &str) -> AgentResult<&'a str> {
    str_arg(arguments, name).ok_or_else(|| {
        AgentError::InvalidParameters(format!("Parameter '{}' must be a string", name))
    })
}

/// Integer argument, tolerating models that send numbers as strings
pub fn u64_arg(arguments: &Value, name: &str) -> Option<u64> {
    match arguments.get(name)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        parameters: Vec<ToolParameter>,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                parameters: vec![
                    ToolParameter::required("text", ParameterType::String, "Text to echo"),
                    ToolParameter::optional(
                        "times",
                        ParameterType::Integer,
                        "Repetitions",
                        Some(json!(1)),
                    ),
                ],
            }
        }
    }

    #[async_trait]
    impl AgentTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo text back"
        }

        fn parameters(&self) -> &[ToolParameter] {
            &self.parameters
        }

        async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
            let text = require_str(&arguments, "text")?;
            let times = u64_arg(&arguments, "times").unwrap_or(1) as usize;
            Ok(ToolResult::success(text.repeat(times)))
        }
    }

    #[test]
    fn test_schema_rendering() {
        let schema = EchoTool::new().schema();
        assert_eq!(schema.name, "echo");
        assert_eq!(
            schema.input_schema,
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "Text to echo"},
                    "times": {"type": "integer", "description": "Repetitions", "default": 1}
                },
                "required": ["text"]
            })
        );
    }

    #[test]
    fn test_validate_required() {
        let tool = EchoTool::new();
        assert!(tool.validate(&json!({"text": "hi"})).is_ok());

        let error = tool.validate(&json!({"times": 2})).unwrap_err();
        assert_eq!(
            error,
            AgentError::InvalidParameters("Required parameter 'text' is missing".to_string())
        );
        assert!(tool.validate(&json!("text")).is_err());
    }

    #[tokio::test]
    async fn test_execute() {
        let result = EchoTool::new()
            .execute(json!({"text": "ab", "times": "2"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.content, "abab");
    }

    #[test]
    fn test_failure_invariant() {
        let result = ToolResult::failure("");
        assert!(!result.success);
        assert!(result.content.is_empty());
        assert_eq!(result.error.as_deref(), Some("Unknown error"));
        assert_eq!(result.to_model_text(), "Error: Unknown error");

        let result: ToolResult = AgentError::ToolNotFound("nope".to_string()).into();
        assert_eq!(result.error.as_deref(), Some("Tool not found: nope"));
    }

    #[test]
    fn test_metadata() {
        let result = ToolResult::success("ok")
            .with_meta("return_code", json!(0))
            .with_meta("shell", json!("bash"));
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata["return_code"], json!(0));
        assert_eq!(metadata.len(), 2);
    }
}
