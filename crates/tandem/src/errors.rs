use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Failures raised while talking to a model backend.
///
/// `Translation` covers everything that goes wrong while mapping the common
/// conversation schema to or from a vendor wire format; the remaining variants
/// are backend-call failures.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Could not translate {backend} payload: {message}")]
    Translation {
        backend: &'static str,
        message: String,
    },

    #[error("Request to {backend} failed: {source}")]
    Request {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {backend} timed out")]
    Timeout { backend: &'static str },

    #[error("{backend} returned {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("{backend} API error: {message}")]
    Api {
        backend: &'static str,
        message: String,
    },

    #[error("Context length exceeded. Message: {0}")]
    ContextLengthExceeded(String),
}

impl ProviderError {
    pub fn translation(backend: &'static str, message: impl Into<String>) -> Self {
        ProviderError::Translation {
            backend,
            message: message.into(),
        }
    }

    pub fn request(backend: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ProviderError::Timeout { backend }
        } else {
            ProviderError::Request { backend, source }
        }
    }

    /// True when the failure happened before or after the network call, while
    /// converting between the common schema and the backend format.
    pub fn is_translation(&self) -> bool {
        matches!(self, ProviderError::Translation { .. })
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
