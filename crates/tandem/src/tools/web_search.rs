use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::exa::{ExaClient, ExaFailure, ExaResult};
use super::{require_str, u64_arg, AgentTool, ParameterType, ToolParameter, ToolResult};
use crate::errors::AgentResult;

/// Results whose url contains one of these are dropped
const FILTERED_KEYWORDS: [&str; 2] = ["gaia", "huggingface"];
const SNIPPET_CHARS: usize = 500;
const DEFAULT_RESULTS: u64 = 10;

pub struct WebSearchTool {
    client: ExaClient,
    parameters: Vec<ToolParameter>,
}

impl WebSearchTool {
    pub fn new(client: ExaClient) -> Self {
        Self {
            client,
            parameters: vec![
                ToolParameter::required("query", ParameterType::String, "What to search for"),
                ToolParameter::optional(
                    "topn",
                    ParameterType::Integer,
                    "Maximum number of results",
                    Some(json!(DEFAULT_RESULTS)),
                ),
            ],
        }
    }
}

fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_CHARS {
        let truncated: String = text.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

fn keep(result: &ExaResult) -> bool {
    let url = result.url.as_deref().unwrap_or_default().to_lowercase();
    !FILTERED_KEYWORDS.iter().any(|keyword| url.contains(keyword))
}

fn format_results(results: &[ExaResult]) -> String {
    if results.is_empty() {
        return "No search results found.".to_string();
    }

    let mut formatted = format!("Search Results:\n{}\n\n", "=".repeat(50));
    for (i, result) in results.iter().enumerate() {
        formatted.push_str(&format!(
            "{}. {}\n",
            i + 1,
            result.title.as_deref().unwrap_or_default()
        ));
        formatted.push_str(&format!(
            "   URL: {}\n",
            result.url.as_deref().unwrap_or_default()
        ));
        formatted.push_str(&format!(
            "   Snippet: {}\n",
            snippet(result.text.as_deref().unwrap_or_default())
        ));
        if let Some(published) = result.published_date.as_deref().filter(|d| !d.is_empty()) {
            formatted.push_str(&format!("   Published: {}\n", published));
        }
        formatted.push_str(&format!("   Score: {}\n\n", result.score.unwrap_or(0.0)));
    }
    formatted
}

#[async_trait]
impl AgentTool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information and return relevant results"
    }

    fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
        let query = require_str(&arguments, "query")?;
        let topn = u64_arg(&arguments, "topn").unwrap_or(DEFAULT_RESULTS);

        if !self.client.has_api_key() {
            return Ok(ToolResult::failure("Exa API key not configured"));
        }

        let payload = json!({
            "query": query,
            "numResults": topn,
            "text": true,
            "highlights": true,
            "summary": true,
        });
        debug!(query, topn, "searching the web");

        let response = match self.client.post("search", &payload).await {
            Ok(response) => response,
            Err(ExaFailure::Status(status, body)) => {
                return Ok(ToolResult::failure(format!(
                    "Search API error: {} - {}",
                    status, body
                )))
            }
            Err(ExaFailure::Other(e)) => {
                return Ok(ToolResult::failure(format!("Web search failed: {}", e)))
            }
        };

        let total = response.results.len();
        let results: Vec<ExaResult> = response.results.into_iter().filter(keep).collect();
        Ok(ToolResult::success(format_results(&results))
            .with_meta("query", json!(query))
            .with_meta("total_results", json!(total))
            .with_meta("filtered_results", json!(results.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response: ResponseTemplate) -> (MockServer, WebSearchTool) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("Authorization", "Bearer exa_key"))
            .and(body_partial_json(json!({"query": "rust async", "numResults": 3})))
            .respond_with(response)
            .mount(&mock_server)
            .await;
        let client = ExaClient::new(mock_server.uri(), "exa_key", Duration::from_secs(5)).unwrap();
        (mock_server, WebSearchTool::new(client))
    }

    #[tokio::test]
    async fn test_search_filters_and_formats() {
        let long_text = "x".repeat(600);
        let (_server, tool) = setup_mock_server(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "title": "Tokio",
                    "url": "https://tokio.rs",
                    "text": long_text,
                    "publishedDate": "2024-01-01",
                    "score": 0.5
                },
                {"title": "Dataset", "url": "https://huggingface.co/datasets/x", "text": "skip"}
            ]
        })))
        .await;

        let result = tool
            .execute(json!({"query": "rust async", "topn": 3}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.content.starts_with("Search Results:\n"));
        assert!(result.content.contains("1. Tokio\n   URL: https://tokio.rs\n"));
        assert!(result.content.contains(&format!("Snippet: {}...\n", "x".repeat(500))));
        assert!(result.content.contains("   Published: 2024-01-01\n   Score: 0.5\n"));
        assert!(!result.content.contains("huggingface"));
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata["total_results"], json!(2));
        assert_eq!(metadata["filtered_results"], json!(1));
    }

    #[tokio::test]
    async fn test_search_api_error() {
        let (_server, tool) =
            setup_mock_server(ResponseTemplate::new(401).set_body_string("bad key")).await;
        let result = tool
            .execute(json!({"query": "rust async", "topn": 3}))
            .await
            .unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("Search API error: 401 - bad key")
        );
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = ExaClient::new("http://localhost:1", "", Duration::from_secs(1)).unwrap();
        let result = WebSearchTool::new(client)
            .execute(json!({"query": "anything"}))
            .await
            .unwrap();
        assert_eq!(result.error.as_deref(), Some("Exa API key not configured"));
    }

    #[test]
    fn test_no_results() {
        assert_eq!(format_results(&[]), "No search results found.");
    }
}
