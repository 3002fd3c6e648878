use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::base::{ModelInfo, Provider};
use super::configs::GeminiProviderConfig;
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

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-1.5-pro";

const BACKEND: &str = "gemini";

/// Schema keywords the function declaration format understands
const SUPPORTED_SCHEMA_KEYS: [&str; 6] =
    ["type", "description", "properties", "required", "items", "enum"];

pub struct GeminiProvider {
    client: Client,
    config: GeminiProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiProviderConfig) -> ProviderResult<Self> {
        let client = build_client(BACKEND, config.timeout)?;
        Ok(Self { client, config })
    }

    async fn post(&self, payload: &Value) -> ProviderResult<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.host.trim_end_matches('/'),
            self.config.model
        );
        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key);
        send_json(BACKEND, request, payload).await
    }
}

/// Translate the history into `systemInstruction` text plus `contents`.
///
/// Gemini names the assistant `model` and expects function responses in a
/// user turn; adjacent turns with the same role are merged.
pub fn messages_to_gemini_spec(messages: &[Message]) -> ProviderResult<(String, Vec<Value>)> {
    let mut system_parts = Vec::new();
    let mut call_names: HashMap<&str, &str> = HashMap::new();
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for message in messages {
        let (role, parts) = match message.role {
            Role::System => {
                if !message.content.is_empty() {
                    system_parts.push(message.content.clone());
                }
                continue;
            }
            Role::User => ("user", text_parts(&message.content)),
            Role::Assistant => {
                let mut parts = text_parts(&message.content);
                for tool_call in &message.tool_calls {
                    call_names.insert(tool_call.id.as_str(), tool_call.name.as_str());
                    parts.push(json!({
                        "functionCall": {
                            "id": tool_call.id,
                            "name": tool_call.name,
                            "args": require_object(BACKEND, &tool_call.arguments)?,
                        }
                    }));
                }
                ("model", parts)
            }
            Role::Tool => {
                let id = require_tool_call_id(BACKEND, message)?;
                let name = message
                    .name
                    .as_deref()
                    .or_else(|| call_names.get(id).copied())
                    .ok_or_else(|| {
                        ProviderError::translation(
                            BACKEND,
                            format!("cannot determine the function name for tool result {}", id),
                        )
                    })?;
                (
                    "user",
                    vec![json!({
                        "functionResponse": {
                            "id": id,
                            "name": name,
                            "response": {"content": message.content},
                        }
                    })],
                )
            }
        };

        if parts.is_empty() {
            continue;
        }
        match turns.last_mut() {
            Some((last_role, last_parts)) if *last_role == role => last_parts.extend(parts),
            _ => turns.push((role, parts)),
        }
    }

    let contents = turns
        .into_iter()
        .map(|(role, parts)| json!({"role": role, "parts": parts}))
        .collect();
    Ok((system_parts.join("\n\n"), contents))
}

fn text_parts(text: &str) -> Vec<Value> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![json!({"text": text})]
    }
}

/// Drop the JSON-schema keywords function declarations reject
pub fn reduce_schema(schema: &Value) -> Value {
    let Some(object) = schema.as_object() else {
        return schema.clone();
    };

    let mut reduced = Map::new();
    for key in SUPPORTED_SCHEMA_KEYS {
        let Some(value) = object.get(key) else {
            continue;
        };
        let value = match key {
            "properties" => match value.as_object() {
                Some(properties) => Value::Object(
                    properties
                        .iter()
                        .map(|(name, property)| (name.clone(), reduce_schema(property)))
                        .collect(),
                ),
                None => value.clone(),
            },
            "items" => reduce_schema(value),
            _ => value.clone(),
        };
        reduced.insert(key.to_string(), value);
    }
    Value::Object(reduced)
}

pub fn tools_to_gemini_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
    validate_tools(BACKEND, tools)?;
    if tools.is_empty() {
        return Ok(Vec::new());
    }
    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": reduce_schema(&tool.input_schema),
            })
        })
        .collect();
    Ok(vec![json!({"functionDeclarations": declarations})])
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
    total_token_count: Option<i32>,
}

fn finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => {
            FinishReason::ContentFilter
        }
        other => FinishReason::Other(other.to_string()),
    }
}

pub fn gemini_response_to_model_response(response: Value) -> ProviderResult<ModelResponse> {
    if let Some(error) = response.get("error") {
        return Err(ProviderError::Api {
            backend: BACKEND,
            message: error.to_string(),
        });
    }

    let response: GenerateContentResponse = parse_body(BACKEND, response)?;
    let candidate = match response.candidates.and_then(|c| c.into_iter().next()) {
        Some(candidate) => candidate,
        None => {
            return Err(match response.prompt_feedback {
                Some(feedback) => ProviderError::Api {
                    backend: BACKEND,
                    message: format!("prompt was blocked: {}", feedback),
                },
                None => ProviderError::translation(BACKEND, "response contained no candidates"),
            })
        }
    };

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    for part in parts {
        if let Some(text) = part.text {
            content.push_str(&text);
        }
        if let Some(call) = part.function_call {
            let id = call
                .id
                .unwrap_or_else(|| format!("call_{}_{}", tool_calls.len(), call.name));
            let args = require_object(BACKEND, &call.args)?;
            tool_calls.push(ToolCall::new(id, call.name, args));
        }
    }

    // Gemini reports STOP even when it asks for function calls
    let finish_reason = if tool_calls.is_empty() {
        candidate.finish_reason.as_deref().map(finish_reason)
    } else {
        Some(FinishReason::ToolCalls)
    };

    let usage = response
        .usage_metadata
        .map(|u| {
            Usage::new(
                u.prompt_token_count,
                u.candidates_token_count,
                u.total_token_count,
            )
        })
        .unwrap_or_default();

    Ok(ModelResponse {
        content,
        tool_calls,
        usage,
        model: response.model_version,
        finish_reason,
    })
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<ModelResponse> {
        let cleaned = clean_messages(messages);
        let (system, contents) = messages_to_gemini_spec(&cleaned)?;
        let tools_spec = tools_to_gemini_spec(tools)?;

        let mut generation_config = Map::new();
        if let Some(temp) = self.config.temperature {
            generation_config.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(tokens));
        }

        let mut payload = json!({ "contents": contents });
        if let Some(object) = payload.as_object_mut() {
            if !system.is_empty() {
                object.insert(
                    "systemInstruction".to_string(),
                    json!({"parts": [{"text": system}]}),
                );
            }
            if !tools_spec.is_empty() {
                object.insert("tools".to_string(), json!(tools_spec));
            }
            if !generation_config.is_empty() {
                object.insert(
                    "generationConfig".to_string(),
                    Value::Object(generation_config),
                );
            }
        }

        let response = self.post(&payload).await?;
        gemini_response_to_model_response(response)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            provider: ProviderType::Gemini,
            model_name: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}
