use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::base::{ModelInfo, Provider};
use super::configs::OpenAiProviderConfig;
use super::factory::ProviderType;
use super::utils::{
    build_client, clean_messages, parse_body, require_object, require_tool_call_id, send_json,
    validate_tools,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::Message;
use crate::models::response::{FinishReason, ModelResponse, Usage};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o";

const BACKEND: &str = "openai";

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> ProviderResult<Self> {
        let client = build_client(BACKEND, config.timeout)?;
        Ok(Self { client, config })
    }

    async fn post(&self, payload: &Value) -> ProviderResult<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );
        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key));

        match send_json(BACKEND, request, payload).await {
            Err(ProviderError::Status { status, body, .. }) => {
                // Raise specific error if context length is exceeded
                let error = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|value| value.get("error").cloned());
                if let Some(err) = error.as_ref().and_then(check_openai_context_length_error) {
                    return Err(err);
                }
                Err(ProviderError::Status {
                    backend: BACKEND,
                    status,
                    body,
                })
            }
            other => other,
        }
    }
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> ProviderResult<Vec<Value>> {
    let mut messages_spec = Vec::with_capacity(messages.len());

    for message in messages {
        let converted = match message.role {
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": require_tool_call_id(BACKEND, message)?,
                "content": message.content,
            }),
            Role::Assistant if message.has_tool_calls() => {
                let mut tool_calls = Vec::with_capacity(message.tool_calls.len());
                for tool_call in &message.tool_calls {
                    let arguments = require_object(BACKEND, &tool_call.arguments)?;
                    tool_calls.push(json!({
                        "id": tool_call.id,
                        "type": "function",
                        "function": {
                            "name": tool_call.name,
                            "arguments": arguments.to_string(),
                        }
                    }));
                }
                let content = if message.content.is_empty() {
                    Value::Null
                } else {
                    json!(message.content)
                };
                json!({
                    "role": "assistant",
                    "content": content,
                    "tool_calls": tool_calls,
                })
            }
            role => json!({
                "role": role.to_string(),
                "content": message.content,
            }),
        };
        messages_spec.push(converted);
    }

    Ok(messages_spec)
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
    validate_tools(BACKEND, tools)?;
    Ok(tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: Option<i32>,
    completion_tokens: Option<i32>,
    total_tokens: Option<i32>,
}

fn finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "length" => FinishReason::MaxTokens,
        "content_filter" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Convert OpenAI's API response to the common response format
pub fn openai_response_to_model_response(response: Value) -> ProviderResult<ModelResponse> {
    if let Some(error) = response.get("error") {
        if let Some(err) = check_openai_context_length_error(error) {
            return Err(err);
        }
        return Err(ProviderError::Api {
            backend: BACKEND,
            message: error.to_string(),
        });
    }

    let completion: ChatCompletion = parse_body(BACKEND, response)?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::translation(BACKEND, "response contained no choices"))?;

    let mut tool_calls = Vec::new();
    for tool_call in choice.message.tool_calls.unwrap_or_default() {
        let raw = tool_call.function.arguments.trim();
        let arguments = if raw.is_empty() {
            json!({})
        } else {
            serde_json::from_str::<Value>(raw).map_err(|e| {
                ProviderError::translation(
                    BACKEND,
                    format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        tool_call.id, e
                    ),
                )
            })?
        };
        let arguments = require_object(BACKEND, &arguments)?;
        tool_calls.push(ToolCall::new(tool_call.id, tool_call.function.name, arguments));
    }

    let usage = completion
        .usage
        .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens, u.total_tokens))
        .unwrap_or_default();

    Ok(ModelResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage,
        model: completion.model,
        finish_reason: choice.finish_reason.as_deref().map(finish_reason),
    })
}

pub fn check_openai_context_length_error(error: &Value) -> Option<ProviderError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ProviderError::ContextLengthExceeded(message))
    } else {
        None
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<ModelResponse> {
        let cleaned = clean_messages(messages);
        let messages_spec = messages_to_openai_spec(&cleaned)?;
        let tools_spec = tools_to_openai_spec(tools)?;

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_spec,
        });
        if let Some(object) = payload.as_object_mut() {
            if !tools_spec.is_empty() {
                object.insert("tools".to_string(), json!(tools_spec));
                object.insert("tool_choice".to_string(), json!("auto"));
            }
            if let Some(temp) = self.config.temperature {
                object.insert("temperature".to_string(), json!(temp));
            }
            if let Some(tokens) = self.config.max_tokens {
                object.insert("max_tokens".to_string(), json!(tokens));
            }
        }

        let response = self.post(&payload).await?;
        openai_response_to_model_response(response)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            provider: ProviderType::OpenAi,
            model_name: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}
