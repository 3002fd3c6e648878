use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::ToolCall;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        // Some backends only report the two halves
        let total_tokens = total_tokens.or(match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => input.checked_add(output),
            _ => None,
        });
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Why the backend stopped generating, in a backend-neutral vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    MaxTokens,
    ContentFilter,
    Other(String),
}

/// Normalized output of one model call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub model: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

impl ModelResponse {
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        }
    }

    pub fn with_tool_call(mut self, tool_call: ToolCall) -> Self {
        self.tool_calls.push(tool_call);
        self.finish_reason = Some(FinishReason::ToolCalls);
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The assistant turn this response contributes to the conversation
    pub fn to_message(&self) -> Message {
        Message::assistant()
            .with_text(self.content.clone())
            .with_tool_calls(self.tool_calls.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_derives_total() {
        let usage = Usage::new(Some(10), Some(20), None);
        assert_eq!(usage.total_tokens, Some(30));

        let usage = Usage::new(Some(10), None, None);
        assert_eq!(usage.total_tokens, None);
    }

    #[test]
    fn test_usage_total_overflow_is_unknown() {
        let usage = Usage::new(Some(i32::MAX), Some(1), None);
        assert_eq!(usage.total_tokens, None);
        assert_eq!(usage.input_tokens, Some(i32::MAX));
    }

    #[test]
    fn test_usage_serialization() {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        let value = serde_json::to_value(&usage).unwrap();
        assert_eq!(value["input_tokens"], json!(10));
        assert_eq!(value["output_tokens"], json!(20));
        assert_eq!(value["total_tokens"], json!(30));
    }

    #[test]
    fn test_to_message_keeps_tool_call_ids() {
        let response = ModelResponse::text("working on it")
            .with_tool_call(ToolCall::new("a", "terminal", json!({"command": "pwd"})))
            .with_tool_call(ToolCall::new("b", "terminal", json!({"command": "ls"})));
        let message = response.to_message();
        let ids: Vec<_> = message.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
    }
}
