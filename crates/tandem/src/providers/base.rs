use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::factory::ProviderType;
use crate::errors::ProviderResult;
use crate::models::message::Message;
use crate::models::response::ModelResponse;
use crate::models::tool::Tool;

/// Static description of the backend a provider talks to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub provider: ProviderType,
    pub model_name: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

/// Base trait for AI providers (OpenAI, Anthropic, etc)
///
/// Implementations clean the history, translate it and the tool schemas into
/// their wire format, make one call, and parse the reply into a
/// [`ModelResponse`]. They never mutate the history they are given.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next response for the conversation so far
    async fn complete(&self, messages: &[Message], tools: &[Tool])
        -> ProviderResult<ModelResponse>;

    fn info(&self) -> ModelInfo;
}
