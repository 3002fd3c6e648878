use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::exa::{ExaClient, ExaFailure, ExaResult};
use super::{require_str, AgentTool, ParameterType, ToolParameter, ToolResult};
use crate::errors::AgentResult;

/// Fetches the full text of one page through Exa's contents endpoint
pub struct WebContentTool {
    client: ExaClient,
    parameters: Vec<ToolParameter>,
}

impl WebContentTool {
    pub fn new(client: ExaClient) -> Self {
        Self {
            client,
            parameters: vec![ToolParameter::required(
                "url",
                ParameterType::String,
                "The page to fetch",
            )],
        }
    }
}

fn format_content(result: &ExaResult) -> String {
    let mut formatted = format!(
        "Title: {}\nURL: {}\n",
        result.title.as_deref().unwrap_or_default(),
        result.url.as_deref().unwrap_or_default()
    );
    if let Some(published) = result.published_date.as_deref().filter(|d| !d.is_empty()) {
        formatted.push_str(&format!("Published: {}\n", published));
    }
    formatted.push_str(&format!("\n{}\n\n", "=".repeat(50)));
    formatted.push_str(result.text.as_deref().unwrap_or_default());
    formatted
}

#[async_trait]
impl AgentTool for WebContentTool {
    fn name(&self) -> &str {
        "web_content"
    }

    fn description(&self) -> &str {
        "Fetch full content from a specific URL"
    }

    fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
        let url = require_str(&arguments, "url")?;

        if !self.client.has_api_key() {
            return Ok(ToolResult::failure("Exa API key not configured"));
        }

        let payload = json!({
            "ids": [url],
            "text": true,
            "highlights": true,
            "summary": true,
        });
        debug!(url, "fetching page content");

        let response = match self.client.post("contents", &payload).await {
            Ok(response) => response,
            Err(ExaFailure::Status(status, body)) => {
                return Ok(ToolResult::failure(format!(
                    "Content fetch API error: {} - {}",
                    status, body
                )))
            }
            Err(ExaFailure::Other(e)) => {
                return Ok(ToolResult::failure(format!("Content fetch failed: {}", e)))
            }
        };

        let Some(first) = response.results.first() else {
            return Ok(ToolResult::failure(
                "No content found for the provided URL",
            ));
        };

        let content = format_content(first);
        let length = content.chars().count();
        Ok(ToolResult::success(content)
            .with_meta("url", json!(url))
            .with_meta("content_length", json!(length))
            .with_meta("title", json!(first.title.as_deref().unwrap_or_default())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn tool_for(body: Value) -> (MockServer, WebContentTool) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contents"))
            .and(body_partial_json(json!({"ids": ["https://example.com"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;
        let client = ExaClient::new(mock_server.uri(), "exa_key", Duration::from_secs(5)).unwrap();
        (mock_server, WebContentTool::new(client))
    }

    #[tokio::test]
    async fn test_fetch_content() {
        let (_server, tool) = tool_for(json!({
            "results": [{
                "title": "Example Domain",
                "url": "https://example.com",
                "text": "This domain is for use in examples."
            }]
        }))
        .await;

        let result = tool
            .execute(json!({"url": "https://example.com"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(
            result.content,
            format!(
                "Title: Example Domain\nURL: https://example.com\n\n{}\n\nThis domain is for use in examples.",
                "=".repeat(50)
            )
        );
        assert_eq!(result.metadata.unwrap()["title"], json!("Example Domain"));
    }

    #[tokio::test]
    async fn test_no_results() {
        let (_server, tool) = tool_for(json!({"results": []})).await;
        let result = tool
            .execute(json!({"url": "https://example.com"}))
            .await
            .unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("No content found for the provided URL")
        );
    }
}
