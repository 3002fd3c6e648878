use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::base::{ModelInfo, Provider};
use super::configs::AnthropicProviderConfig;
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

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_DEFAULT_MAX_TOKENS: i32 = 4096;

const BACKEND: &str = "anthropic";

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> ProviderResult<Self> {
        let client = build_client(BACKEND, config.timeout)?;
        Ok(Self { client, config })
    }

    async fn post(&self, payload: &Value) -> ProviderResult<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));
        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        match send_json(BACKEND, request, payload).await {
            Err(ProviderError::Status { status, body, .. }) => {
                if let Some(err) = serde_json::from_str::<Value>(&body)
                    .ok()
                    .as_ref()
                    .and_then(|v| v.get("error"))
                    .and_then(check_anthropic_context_length_error)
                {
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

/// Split the history into the top-level system prompt and the alternating
/// user/assistant turns the messages API expects.
///
/// Tool results travel as `tool_result` blocks inside a user turn, so
/// consecutive results (and any user text right after them) collapse into one
/// turn.
pub fn messages_to_anthropic_spec(messages: &[Message]) -> ProviderResult<(String, Vec<Value>)> {
    let mut system_parts = Vec::new();
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for message in messages {
        let (role, blocks) = match message.role {
            Role::System => {
                if !message.content.is_empty() {
                    system_parts.push(message.content.clone());
                }
                continue;
            }
            Role::User => ("user", text_blocks(&message.content)),
            Role::Tool => {
                let tool_use_id = require_tool_call_id(BACKEND, message)?;
                (
                    "user",
                    vec![json!({
                        "type": "tool_result",
                        "tool_use_id": tool_use_id,
                        "content": message.content,
                    })],
                )
            }
            Role::Assistant => {
                let mut blocks = text_blocks(&message.content);
                for tool_call in &message.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": tool_call.id,
                        "name": tool_call.name,
                        "input": require_object(BACKEND, &tool_call.arguments)?,
                    }));
                }
                ("assistant", blocks)
            }
        };

        if blocks.is_empty() {
            continue;
        }
        match turns.last_mut() {
            Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
            _ => turns.push((role, blocks)),
        }
    }

    let spec = turns
        .into_iter()
        .map(|(role, content)| json!({"role": role, "content": content}))
        .collect();
    Ok((system_parts.join("\n\n"), spec))
}

fn text_blocks(text: &str) -> Vec<Value> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![json!({"type": "text", "text": text})]
    }
}

pub fn tools_to_anthropic_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
    validate_tools(BACKEND, tools)?;
    Ok(tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema,
            })
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: Option<String>,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<i32>,
    output_tokens: Option<i32>,
}

fn finish_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "tool_use" => FinishReason::ToolCalls,
        "max_tokens" => FinishReason::MaxTokens,
        other => FinishReason::Other(other.to_string()),
    }
}

pub fn anthropic_response_to_model_response(response: Value) -> ProviderResult<ModelResponse> {
    if let Some(error) = response.get("error") {
        if let Some(err) = check_anthropic_context_length_error(error) {
            return Err(err);
        }
        return Err(ProviderError::Api {
            backend: BACKEND,
            message: error.to_string(),
        });
    }

    let response: MessagesResponse = parse_body(BACKEND, response)?;

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for block in response.content {
        match block {
            ContentBlock::Text { text } => content.push_str(&text),
            ContentBlock::ToolUse { id, name, input } => {
                let input = require_object(BACKEND, &input)?;
                tool_calls.push(ToolCall::new(id, name, input));
            }
            ContentBlock::Unsupported => {}
        }
    }

    let usage = response
        .usage
        .map(|u| Usage::new(u.input_tokens, u.output_tokens, None))
        .unwrap_or_default();

    Ok(ModelResponse {
        content,
        tool_calls,
        usage,
        model: response.model,
        finish_reason: response.stop_reason.as_deref().map(finish_reason),
    })
}

pub fn check_anthropic_context_length_error(error: &Value) -> Option<ProviderError> {
    let message = error.get("message")?.as_str()?;
    if message.contains("prompt is too long") || message.contains("context window") {
        Some(ProviderError::ContextLengthExceeded(message.to_string()))
    } else {
        None
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<ModelResponse> {
        let cleaned = clean_messages(messages);
        let (system, messages_spec) = messages_to_anthropic_spec(&cleaned)?;
        let tools_spec = tools_to_anthropic_spec(tools)?;

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_spec,
            "max_tokens": self.config.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
        });
        if let Some(object) = payload.as_object_mut() {
            if !system.is_empty() {
                object.insert("system".to_string(), json!(system));
            }
            if !tools_spec.is_empty() {
                object.insert("tools".to_string(), json!(tools_spec));
            }
            if let Some(temp) = self.config.temperature {
                object.insert("temperature".to_string(), json!(temp));
            }
        }

        let response = self.post(&payload).await?;
        anthropic_response_to_model_response(response)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            provider: ProviderType::Anthropic,
            model_name: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}
