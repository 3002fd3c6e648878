use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("MCP server '{server}' is not configured")]
    NotConfigured { server: String },

    #[error("MCP server '{server}' is disabled")]
    Disabled { server: String },

    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },

    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },

    #[error("MCP server '{server}' terminated unexpectedly")]
    Terminated { server: String },

    #[error("MCP server '{server}' did not answer '{method}' within {timeout:?}")]
    Timeout {
        server: String,
        method: String,
        timeout: Duration,
    },

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Server '{0}' not connected")]
    NotConnected(String),
}

impl McpError {
    /// True when the session can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            McpError::Transport { .. } | McpError::Terminated { .. } | McpError::Timeout { .. }
        )
    }
}

pub type McpResult<T> = Result<T, McpError>;
