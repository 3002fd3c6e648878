use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Strip trailing whitespace from every message. Every adapter runs this
/// before translating, so all backends see identical text.
pub fn clean_messages(messages: &[Message]) -> Vec<Message> {
    messages.iter().map(Message::cleaned).collect()
}

pub fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Reject tool lists the backends would refuse: duplicate or malformed names
/// and schemas that are not JSON objects.
pub fn validate_tools(backend: &'static str, tools: &[Tool]) -> ProviderResult<()> {
    let mut tool_names = HashSet::new();
    for tool in tools {
        if !tool_names.insert(tool.name.as_str()) {
            return Err(ProviderError::translation(
                backend,
                format!("Duplicate tool name: {}", tool.name),
            ));
        }
        if !is_valid_function_name(&tool.name) {
            return Err(ProviderError::translation(
                backend,
                format!(
                    "The tool name '{}' has invalid characters, it must match [a-zA-Z0-9_-]+",
                    tool.name
                ),
            ));
        }
        if !tool.input_schema.is_object() {
            return Err(ProviderError::translation(
                backend,
                format!("The input schema of tool '{}' is not an object", tool.name),
            ));
        }
    }
    Ok(())
}

/// A tool message must point back at the call it answers
pub fn require_tool_call_id<'a>(
    backend: &'static str,
    message: &'a Message,
) -> ProviderResult<&'a str> {
    message.tool_call_id.as_deref().ok_or_else(|| {
        ProviderError::translation(backend, "tool message is missing its tool_call_id")
    })
}

/// Tool call arguments must be JSON objects on every backend
pub fn require_object(backend: &'static str, arguments: &Value) -> ProviderResult<Value> {
    match arguments {
        Value::Object(_) => Ok(arguments.clone()),
        Value::Null => Ok(Value::Object(Default::default())),
        other => Err(ProviderError::translation(
            backend,
            format!("tool call arguments must be an object, got {}", other),
        )),
    }
}

pub fn build_client(backend: &'static str, timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| ProviderError::request(backend, source))
}

/// Send a JSON payload and return the decoded JSON body of a 200 response.
pub async fn send_json(
    backend: &'static str,
    request: RequestBuilder,
    payload: &Value,
) -> ProviderResult<Value> {
    let response = request
        .json(payload)
        .send()
        .await
        .map_err(|source| ProviderError::request(backend, source))?;

    match response.status() {
        StatusCode::OK => {
            let body = response
                .text()
                .await
                .map_err(|source| ProviderError::request(backend, source))?;
            serde_json::from_str(&body).map_err(|e| {
                ProviderError::translation(backend, format!("response is not valid JSON: {}", e))
            })
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::Status {
                backend,
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Decode a response body into the backend's typed representation
pub fn parse_body<T: DeserializeOwned>(backend: &'static str, body: Value) -> ProviderResult<T> {
    serde_json::from_value(body)
        .map_err(|e| ProviderError::translation(backend, format!("unexpected response: {}", e)))
}
