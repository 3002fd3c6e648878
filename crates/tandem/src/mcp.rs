//! Client side of the Model Context Protocol.
//!
//! [`McpClient`] owns one [`McpSession`] per connected provider process and
//! folds every advertised tool into a single table keyed by
//! `{server}_{tool}`. [`BrowserTool`] and [`McpTool`] expose that table to
//! the agent.

pub mod browser;
pub mod client;
pub mod error;
pub mod protocol;
pub mod remote_tool;
pub mod session;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use browser::{BrowserAction, BrowserTool};
pub use client::{McpClient, RemoteTool};
pub use error::{McpError, McpResult};
pub use protocol::CallToolResult;
pub use remote_tool::McpTool;
pub use session::McpSession;

/// How to launch one provider process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ServerConfig {
    pub fn new<N, C, I, A>(name: N, command: C, args: I) -> Self
    where
        N: Into<String>,
        C: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            name: name.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: None,
            enabled: true,
        }
    }

    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Well-known provider processes, registered disabled
pub fn default_server_configs() -> Vec<ServerConfig> {
    vec![
        ServerConfig::new(
            "browser_use",
            "npx",
            ["@modelcontextprotocol/server-brave-search"],
        )
        .enabled(false),
        ServerConfig::new("puppeteer", "npx", ["@modelcontextprotocol/server-puppeteer"])
            .enabled(false),
        ServerConfig::new("playwright", "node", ["playwright-mcp-server.js"]).enabled(false),
    ]
}
