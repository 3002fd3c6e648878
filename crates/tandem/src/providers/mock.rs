use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use super::base::{ModelInfo, Provider};
use super::factory::ProviderType;
use crate::errors::ProviderResult;
use crate::models::message::Message;
use crate::models::response::ModelResponse;
use crate::models::tool::Tool;

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<ProviderResult<ModelResponse>>>>,
    repeat: Option<ModelResponse>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
    tools_seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Script failures as well as responses
    pub fn with_results(results: Vec<ProviderResult<ModelResponse>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(results.into())),
            repeat: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            tools_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every call with the same response
    pub fn repeating(response: ModelResponse) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.repeat = Some(response);
        provider
    }

    /// Handle onto the histories this provider was called with
    pub fn calls(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        Arc::clone(&self.calls)
    }

    pub fn tools_seen(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.tools_seen)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> ProviderResult<ModelResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.tools_seen
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());

        if let Some(response) = &self.repeat {
            return Ok(response.clone());
        }
        let mut responses = self.responses.lock().unwrap();
        // Return empty response if no more pre-configured responses
        responses
            .pop_front()
            .unwrap_or_else(|| Ok(ModelResponse::text("")))
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            provider: ProviderType::OpenAi,
            model_name: "mock-model".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}
