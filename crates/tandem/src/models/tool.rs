use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool that can be used by a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A JSON Schema object defining the expected parameters for the tool
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Names listed in the schema's `required` array
    pub fn required_parameters(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|required| required.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// A model's request to invoke a tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Opaque id assigned by the backend, echoed back in the tool result
    pub id: String,
    /// The name of the tool to execute
    pub name: String,
    /// The parameters for the execution, always a JSON object
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new ToolCall with the given id, name and arguments
    pub fn new<I: Into<String>, S: Into<String>>(id: I, name: S, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}
