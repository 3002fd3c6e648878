//! Minimal client for the Exa search API shared by the web tools.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};

pub const EXA_HOST: &str = "https://api.exa.ai";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ExaResponse {
    #[serde(default)]
    pub results: Vec<ExaResult>,
}

/// Why an Exa call did not produce results
pub enum ExaFailure {
    /// The API answered with a non-200 status
    Status(u16, String),
    Other(String),
}

#[derive(Clone)]
pub struct ExaClient {
    client: Client,
    host: String,
    api_key: String,
}

impl ExaClient {
    pub fn new<H: Into<String>, K: Into<String>>(host: H, api_key: K, timeout: Duration) -> AgentResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            host: host.into(),
            api_key: api_key.into(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// POST `payload` to `{host}/{endpoint}`
    pub async fn post(&self, endpoint: &str, payload: &Value) -> Result<ExaResponse, ExaFailure> {
        let url = format!("{}/{}", self.host.trim_end_matches('/'), endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| ExaFailure::Other(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<ExaResponse>()
                .await
                .map_err(|e| ExaFailure::Other(e.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ExaFailure::Status(status.as_u16(), body))
            }
        }
    }
}
