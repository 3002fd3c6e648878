use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use super::browser::configured_browser_server;
use super::error::{McpError, McpResult};
use super::protocol::CallToolResult;
use super::session::McpSession;
use super::{default_server_configs, ServerConfig};
use crate::config::Settings;
use crate::models::tool::Tool;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One capability advertised by a connected server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    /// `{server_name}_{raw_name}`
    pub name: String,
    /// Name the owning server knows the tool by
    pub raw_name: String,
    pub description: String,
    pub input_schema: Value,
    pub server_name: String,
}

impl RemoteTool {
    pub fn qualified_name(server: &str, raw_name: &str) -> String {
        format!("{}_{}", server, raw_name)
    }

    pub fn to_tool(&self) -> Tool {
        Tool::new(&self.name, &self.description, self.input_schema.clone())
    }
}

struct ConnectedServer {
    session: Arc<McpSession>,
    tool_names: Vec<String>,
}

/// Multiplexes any number of provider processes behind one tool table.
///
/// Configuration, sessions and the tool table each sit behind their own
/// lock. `connect`, `disconnect` and `cleanup` additionally take the
/// lifecycle lock so a server's tools only become visible once its session
/// is registered.
pub struct McpClient {
    configs: RwLock<IndexMap<String, ServerConfig>>,
    sessions: RwLock<IndexMap<String, ConnectedServer>>,
    tools: RwLock<IndexMap<String, RemoteTool>>,
    lifecycle: Mutex<()>,
    request_timeout: Duration,
}

impl Default for McpClient {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl McpClient {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            configs: RwLock::new(IndexMap::new()),
            sessions: RwLock::new(IndexMap::new()),
            tools: RwLock::new(IndexMap::new()),
            lifecycle: Mutex::new(()),
            request_timeout,
        }
    }

    /// A client preloaded with the default (disabled) server catalogue
    pub async fn with_default_servers(request_timeout: Duration) -> Self {
        let client = Self::new(request_timeout);
        for config in default_server_configs() {
            client.add_server_config(config).await;
        }
        client
    }

    /// The default catalogue plus the configured browser server, enabled.
    /// The configured entry replaces a catalogue entry of the same name.
    pub async fn from_settings(settings: &Settings) -> Self {
        let client = Self::with_default_servers(settings.mcp_request_timeout()).await;
        client
            .add_server_config(configured_browser_server(settings).enabled(true))
            .await;
        client
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Store (or replace) a server configuration without connecting
    pub async fn add_server_config(&self, config: ServerConfig) {
        self.configs.write().await.insert(config.name.clone(), config);
    }

    pub async fn server_config(&self, server_name: &str) -> Option<ServerConfig> {
        self.configs.read().await.get(server_name).cloned()
    }

    pub async fn server_names(&self) -> Vec<String> {
        self.configs.read().await.keys().cloned().collect()
    }

    /// Launch and register one server. Failures are logged and reported as
    /// `false`; they never affect other servers.
    pub async fn connect(&self, server_name: &str) -> bool {
        match self.try_connect(server_name).await {
            Ok(()) => true,
            Err(McpError::Disabled { .. }) => {
                info!(server = server_name, "server is disabled");
                false
            }
            Err(e) => {
                error!(server = server_name, error = %e, "failed to connect to server");
                false
            }
        }
    }

    pub async fn try_connect(&self, server_name: &str) -> McpResult<()> {
        let _lifecycle = self.lifecycle.lock().await;

        let config = self
            .server_config(server_name)
            .await
            .ok_or_else(|| McpError::NotConfigured {
                server: server_name.to_string(),
            })?;
        if !config.enabled {
            return Err(McpError::Disabled {
                server: server_name.to_string(),
            });
        }
        let existing = self
            .sessions
            .read()
            .await
            .get(server_name)
            .map(|server| Arc::clone(&server.session));
        if let Some(session) = existing {
            if session.is_open().await {
                return Ok(());
            }
            // The process died since it connected; start over
            self.forget(server_name).await;
        }

        let session = McpSession::spawn(&config, self.request_timeout).await?;
        let advertised = match session.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                session.close().await;
                return Err(e);
            }
        };

        // Build the full registration before anything becomes visible
        let mut registered = Vec::with_capacity(advertised.len());
        {
            let tools = self.tools.read().await;
            for info in advertised {
                let name = RemoteTool::qualified_name(server_name, &info.name);
                if let Some(existing) = tools.get(&name) {
                    warn!(
                        server = server_name,
                        tool = %name,
                        owner = %existing.server_name,
                        "qualified tool name already registered by another server, skipping"
                    );
                    continue;
                }
                registered.push(RemoteTool {
                    name,
                    raw_name: info.name,
                    description: info.description.unwrap_or_default(),
                    input_schema: info.input_schema,
                    server_name: server_name.to_string(),
                });
            }
        }

        let tool_names: Vec<String> = registered.iter().map(|t| t.raw_name.clone()).collect();
        info!(server = server_name, tools = ?tool_names, "connected to server");

        self.sessions.write().await.insert(
            server_name.to_string(),
            ConnectedServer {
                session: Arc::new(session),
                tool_names,
            },
        );
        let mut tools = self.tools.write().await;
        for tool in registered {
            tools.insert(tool.name.clone(), tool);
        }
        Ok(())
    }

    /// Attempt every registered server independently
    pub async fn connect_all(&self) -> IndexMap<String, bool> {
        let mut results = IndexMap::new();
        for server_name in self.server_names().await {
            let connected = self.connect(&server_name).await;
            results.insert(server_name, connected);
        }
        results
    }

    /// Route a call by qualified name to the owning session
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> McpResult<CallToolResult> {
        let tool = self
            .tools
            .read()
            .await
            .get(tool_name)
            .cloned()
            .ok_or_else(|| McpError::ToolNotFound(tool_name.to_string()))?;
        let session = self
            .sessions
            .read()
            .await
            .get(&tool.server_name)
            .map(|server| Arc::clone(&server.session))
            .ok_or_else(|| McpError::NotConnected(tool.server_name.clone()))?;

        match session.call_tool(&tool.raw_name, arguments).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(tool = tool_name, error = %e, "tool call failed");
                if e.is_fatal() {
                    self.prune(&tool.server_name, &session).await;
                }
                Err(e)
            }
        }
    }

    /// Drop a server whose session closed itself, unless it was already
    /// replaced by a fresh connection
    async fn prune(&self, server_name: &str, dead: &Arc<McpSession>) {
        let _lifecycle = self.lifecycle.lock().await;
        let current = self
            .sessions
            .read()
            .await
            .get(server_name)
            .map(|server| Arc::clone(&server.session));
        if let Some(session) = current {
            if Arc::ptr_eq(&session, dead) && !session.is_open().await {
                self.forget(server_name).await;
                warn!(server = server_name, "removed dead server and its tools");
            }
        }
    }

    /// Schemas of every remote tool, in registration order
    pub async fn available_tools(&self) -> Vec<Tool> {
        self.tools
            .read()
            .await
            .values()
            .map(RemoteTool::to_tool)
            .collect()
    }

    pub async fn remote_tools(&self) -> Vec<RemoteTool> {
        self.tools.read().await.values().cloned().collect()
    }

    pub async fn remote_tool(&self, tool_name: &str) -> Option<RemoteTool> {
        self.tools.read().await.get(tool_name).cloned()
    }

    pub async fn tools_for_server(&self, server_name: &str) -> Vec<RemoteTool> {
        self.tools
            .read()
            .await
            .values()
            .filter(|tool| tool.server_name == server_name)
            .cloned()
            .collect()
    }

    /// Ask a connected server for its current tool names
    pub async fn list_server_tools(&self, server_name: &str) -> McpResult<Vec<String>> {
        let session = match self.sessions.read().await.get(server_name) {
            Some(server) => Arc::clone(&server.session),
            None => return Ok(Vec::new()),
        };
        let tools = session.list_tools().await?;
        Ok(tools.into_iter().map(|tool| tool.name).collect())
    }

    /// Raw tool names the server advertised when it connected
    pub async fn advertised_tools(&self, server_name: &str) -> Vec<String> {
        self.sessions
            .read()
            .await
            .get(server_name)
            .map(|server| server.tool_names.clone())
            .unwrap_or_default()
    }

    /// True only while the server's session is still open
    pub async fn is_connected(&self, server_name: &str) -> bool {
        let session = self
            .sessions
            .read()
            .await
            .get(server_name)
            .map(|server| Arc::clone(&server.session));
        match session {
            Some(session) => session.is_open().await,
            None => false,
        }
    }

    pub async fn connected_servers(&self) -> Vec<String> {
        let sessions: Vec<(String, Arc<McpSession>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(name, server)| (name.clone(), Arc::clone(&server.session)))
            .collect();
        let mut open = Vec::with_capacity(sessions.len());
        for (name, session) in sessions {
            if session.is_open().await {
                open.push(name);
            }
        }
        open
    }

    /// Drop a server's tools and session; a no-op when not connected
    pub async fn disconnect(&self, server_name: &str) {
        let _lifecycle = self.lifecycle.lock().await;
        if self.forget(server_name).await {
            info!(server = server_name, "disconnected from server");
        }
    }

    /// Remove a server's entries and close its session, tools first
    async fn forget(&self, server_name: &str) -> bool {
        self.tools
            .write()
            .await
            .retain(|_, tool| tool.server_name != server_name);
        let removed = self.sessions.write().await.shift_remove(server_name);
        match removed {
            Some(server) => {
                server.session.close().await;
                true
            }
            None => false,
        }
    }

    /// Release every session, newest first, and clear all tables.
    /// Safe to call any number of times.
    pub async fn cleanup(&self) {
        let _lifecycle = self.lifecycle.lock().await;

        self.tools.write().await.clear();
        let sessions: Vec<(String, ConnectedServer)> =
            self.sessions.write().await.drain(..).collect();
        for (server_name, server) in sessions.into_iter().rev() {
            server.session.close().await;
            info!(server = %server_name, "closed session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_connect_unknown_and_disabled() {
        let client = McpClient::with_default_servers(Duration::from_secs(1)).await;
        assert!(!client.connect("nonexistent").await);
        assert!(!client.connect("puppeteer").await);
        assert!(matches!(
            client.try_connect("puppeteer").await,
            Err(McpError::Disabled { .. })
        ));
        assert!(client.connected_servers().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_command_reports_false() {
        let client = McpClient::default();
        client
            .add_server_config(ServerConfig::new(
                "browser_use",
                "definitely-not-an-mcp-server-91c2",
                Vec::<String>::new(),
            ))
            .await;
        assert!(!client.connect("browser_use").await);
        assert!(client.tools_for_server("browser_use").await.is_empty());
        assert!(!client.is_connected("browser_use").await);
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let client = McpClient::default();
        let error = client
            .call_tool("browser_use_navigate", json!({}))
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Tool 'browser_use_navigate' not found");
    }

    #[tokio::test]
    async fn test_cleanup_without_sessions_is_idempotent() {
        let client = McpClient::default();
        client.cleanup().await;
        client.cleanup().await;
        client.disconnect("never_connected").await;
        assert!(client.available_tools().await.is_empty());
        assert!(client.list_server_tools("never_connected").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_settings_enables_configured_browser_server() {
        let settings = Settings::from_env_map(std::collections::HashMap::from([
            ("MCP_BROWSER_SERVER".to_string(), "puppeteer".to_string()),
            (
                "MCP_BROWSER_ARGS".to_string(),
                "-y @modelcontextprotocol/server-puppeteer".to_string(),
            ),
            ("MCP_REQUEST_TIMEOUT".to_string(), "5".to_string()),
        ]))
        .unwrap();
        let client = McpClient::from_settings(&settings).await;

        assert_eq!(client.request_timeout(), Duration::from_secs(5));
        assert_eq!(
            client.server_names().await,
            vec!["browser_use", "puppeteer", "playwright"]
        );
        let puppeteer = client.server_config("puppeteer").await.unwrap();
        assert!(puppeteer.enabled);
        assert_eq!(puppeteer.command, "npx");
        assert_eq!(
            puppeteer.args,
            vec!["-y", "@modelcontextprotocol/server-puppeteer"]
        );
        assert!(!client.server_config("browser_use").await.unwrap().enabled);
        assert!(!client.server_config("playwright").await.unwrap().enabled);
    }

    #[test]
    fn test_qualified_name_keeps_raw_name() {
        let tool = RemoteTool {
            name: RemoteTool::qualified_name("browser_use", "get_page_content"),
            raw_name: "get_page_content".to_string(),
            description: "Read the page".to_string(),
            input_schema: json!({"type": "object"}),
            server_name: "browser_use".to_string(),
        };
        assert_eq!(tool.name, "browser_use_get_page_content");
        assert_eq!(tool.to_tool().name, tool.name);
    }
}
