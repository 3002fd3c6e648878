//! JSON-RPC 2.0 framing and the MCP payloads this client understands.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::content::{join_display_text, Content};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const JSONRPC_VERSION: &str = "2.0";
pub const METHOD_NOT_FOUND: i64 = -32601;

pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": method,
        "params": params,
    })
}

pub fn notification(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
    })
}

pub fn response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

pub fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {"code": code, "message": message},
    })
}

pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

/// Shape of an inbound line once parsed
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// Reply to one of our requests
    Response { id: Value, payload: Value },
    /// The server asks us something
    Request { id: Value, method: String },
    Notification { method: String },
    Other,
}

pub fn classify(value: Value) -> Inbound {
    let method = value
        .get("method")
        .and_then(Value::as_str)
        .map(str::to_string);
    match (value.get("id").cloned(), method) {
        (Some(id), Some(method)) => Inbound::Request { id, method },
        (None, Some(method)) => Inbound::Notification { method },
        (Some(id), None) => Inbound::Response { id, payload: value },
        (None, None) => Inbound::Other,
    }
}

/// Whether a response id refers to request number `id`
pub fn id_matches(response_id: &Value, id: u64) -> bool {
    match response_id {
        Value::Number(n) => n.as_u64() == Some(id),
        Value::String(s) => s.parse::<u64>().ok() == Some(id),
        _ => false,
    }
}

/// One entry of a `tools/list` reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Result of a `tools/call` request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    pub is_error: bool,
}

impl CallToolResult {
    /// Parse the result payload; segments of unknown kinds are kept as
    /// their JSON text.
    pub fn from_value(value: &Value) -> Self {
        let content = value
            .get("content")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(parse_content).collect())
            .unwrap_or_default();
        let is_error = value
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self { content, is_error }
    }

    pub fn text(&self) -> String {
        join_display_text(&self.content)
    }
}

fn parse_content(item: &Value) -> Content {
    let field = |name: &str| item.get(name).and_then(Value::as_str);
    match field("type") {
        Some("text") => Content::text(field("text").unwrap_or_default()),
        Some("image") => Content::image(
            field("data").unwrap_or_default(),
            field("mimeType").unwrap_or("image/png"),
        ),
        Some("resource") => {
            let resource = item.get("resource");
            let text = resource
                .and_then(|r| r.get("text"))
                .and_then(Value::as_str)
                .or_else(|| resource.and_then(|r| r.get("uri")).and_then(Value::as_str))
                .unwrap_or_default();
            Content::text(text)
        }
        _ => Content::text(item.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(json!({"jsonrpc": "2.0", "id": 7, "method": "ping"})),
            Inbound::Request {
                id: json!(7),
                method: "ping".to_string()
            }
        );
        assert_eq!(
            classify(json!({"jsonrpc": "2.0", "method": "notifications/message"})),
            Inbound::Notification {
                method: "notifications/message".to_string()
            }
        );
        assert!(matches!(
            classify(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
            Inbound::Response { .. }
        ));
        assert_eq!(classify(json!({"hello": "world"})), Inbound::Other);
    }

    #[test]
    fn test_id_matches() {
        assert!(id_matches(&json!(3), 3));
        assert!(id_matches(&json!("3"), 3));
        assert!(!id_matches(&json!(4), 3));
        assert!(!id_matches(&Value::Null, 3));
    }

    #[test]
    fn test_call_tool_result_parsing() {
        let result = CallToolResult::from_value(&json!({
            "content": [
                {"type": "text", "text": "Navigated"},
                {"type": "image", "data": "aGVsbG8=", "mimeType": "image/jpeg"},
                {"type": "resource", "resource": {"uri": "file:///tmp/a.txt", "text": "body"}}
            ],
            "isError": false
        }));
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 3);
        assert_eq!(
            result.text(),
            "Navigated\n[Image: image/jpeg (8 bytes base64)]\nbody"
        );

        let result = CallToolResult::from_value(&json!({
            "content": [{"type": "text", "text": "no such selector"}],
            "isError": true
        }));
        assert!(result.is_error);
    }

    #[test]
    fn test_list_tools_result() {
        let result: ListToolsResult = serde_json::from_value(json!({
            "tools": [
                {"name": "navigate", "description": "Go", "inputSchema": {"type": "object"}},
                {"name": "bare"}
            ],
            "nextCursor": "page-2"
        }))
        .unwrap();
        assert_eq!(result.tools[1].description, None);
        assert_eq!(result.tools[1].input_schema["type"], "object");
        assert_eq!(result.next_cursor.as_deref(), Some("page-2"));
    }
}
