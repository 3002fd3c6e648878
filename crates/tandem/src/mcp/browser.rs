use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::client::{McpClient, RemoteTool};
use super::ServerConfig;
use crate::config::Settings;
use crate::errors::{AgentError, AgentResult};
use crate::tools::{str_arg, AgentTool, ParameterType, ToolParameter, ToolResult};

/// High-level browser actions, mapped onto whichever server is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BrowserAction {
    Navigate,
    Click,
    Type,
    Screenshot,
    Wait,
    #[strum(to_string = "get_page_content", serialize = "get_content")]
    GetPageContent,
    FindElement,
    Scroll,
    Back,
    Forward,
    Refresh,
    Close,
}

fn first_str<'a>(arguments: &'a Value, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| str_arg(arguments, name))
        .filter(|value| !value.is_empty())
}

fn required<'a>(action: BrowserAction, arguments: &'a Value, name: &str) -> AgentResult<&'a str> {
    first_str(arguments, &[name]).ok_or_else(|| {
        AgentError::InvalidParameters(format!(
            "Browser action '{}' requires parameter '{}'",
            action, name
        ))
    })
}

impl BrowserAction {
    /// Raw tool names a server may use for this action, preferred first
    pub fn tool_names(&self) -> Vec<String> {
        match self {
            BrowserAction::GetPageContent => {
                vec!["get_page_content".to_string(), "get_content".to_string()]
            }
            other => vec![other.to_string()],
        }
    }

    /// Translate the agent-level arguments into the server call arguments
    pub fn arguments(&self, arguments: &Value) -> AgentResult<Value> {
        let mut mapped = Map::new();
        let wait_for = first_str(arguments, &["wait_for", "waitFor"]);
        let selector = first_str(arguments, &["selector"]);

        match self {
            BrowserAction::Navigate => {
                mapped.insert("url".into(), json!(required(*self, arguments, "url")?));
                if let Some(wait_for) = wait_for {
                    mapped.insert("waitFor".into(), json!(wait_for));
                }
            }
            BrowserAction::Click => {
                mapped.insert("selector".into(), json!(required(*self, arguments, "selector")?));
                if let Some(wait_for) = wait_for {
                    mapped.insert("waitFor".into(), json!(wait_for));
                }
            }
            BrowserAction::Type => {
                mapped.insert("selector".into(), json!(required(*self, arguments, "selector")?));
                mapped.insert("text".into(), json!(required(*self, arguments, "text")?));
            }
            BrowserAction::Screenshot => {
                if let Some(selector) = selector {
                    mapped.insert("selector".into(), json!(selector));
                }
                let full_page = ["full_page", "fullPage"]
                    .iter()
                    .any(|name| arguments.get(name).and_then(Value::as_bool) == Some(true));
                if full_page {
                    mapped.insert("fullPage".into(), json!(true));
                }
            }
            BrowserAction::Wait => {
                let target = wait_for.or(selector).ok_or_else(|| {
                    AgentError::InvalidParameters(
                        "Browser action 'wait' requires parameter 'wait_for' or 'selector'"
                            .to_string(),
                    )
                })?;
                mapped.insert("selector".into(), json!(target));
                if let Some(timeout) = arguments.get("timeout").filter(|t| !t.is_null()) {
                    mapped.insert("timeout".into(), timeout.clone());
                }
            }
            BrowserAction::GetPageContent => {
                if let Some(selector) = selector {
                    mapped.insert("selector".into(), json!(selector));
                }
            }
            BrowserAction::FindElement => {
                mapped.insert("selector".into(), json!(required(*self, arguments, "selector")?));
            }
            BrowserAction::Scroll => {
                if let Some(selector) = selector {
                    mapped.insert("selector".into(), json!(selector));
                }
                if let Some(direction) = first_str(arguments, &["direction"]) {
                    mapped.insert("direction".into(), json!(direction));
                }
                if let Some(amount) = arguments.get("amount").filter(|a| !a.is_null()) {
                    mapped.insert("amount".into(), amount.clone());
                }
            }
            BrowserAction::Back
            | BrowserAction::Forward
            | BrowserAction::Refresh
            | BrowserAction::Close => {}
        }
        Ok(Value::Object(mapped))
    }
}

/// Provider processes tried, in order, when no settings are given
pub fn default_browser_candidates() -> Vec<ServerConfig> {
    vec![
        ServerConfig::new("browser_use", "npx", ["@co-browser/browser-use-mcp"]),
        ServerConfig::new("puppeteer", "npx", ["@modelcontextprotocol/server-puppeteer"]),
        ServerConfig::new("playwright", "node", ["playwright-server.js"]),
    ]
}

/// The server named by the `MCP_BROWSER_*` settings, enabled
pub fn configured_browser_server(settings: &Settings) -> ServerConfig {
    ServerConfig::new(
        settings.mcp_browser_server.clone(),
        settings.mcp_browser_command.clone(),
        settings.mcp_browser_args.split_whitespace(),
    )
}

/// The configured browser server first, then the remaining defaults
pub fn browser_candidates(settings: &Settings) -> Vec<ServerConfig> {
    let mut candidates = vec![configured_browser_server(settings)];
    for fallback in default_browser_candidates() {
        if candidates.iter().all(|c| c.name != fallback.name) {
            candidates.push(fallback);
        }
    }
    candidates
}

/// Browser automation backed by the first candidate server that connects
pub struct BrowserTool {
    client: Arc<McpClient>,
    candidates: Vec<ServerConfig>,
    bound: Mutex<Option<String>>,
    description: String,
    parameters: Vec<ToolParameter>,
}

impl BrowserTool {
    pub fn new(client: Arc<McpClient>, candidates: Vec<ServerConfig>) -> Self {
        let actions: Vec<String> = BrowserAction::iter().map(|a| a.to_string()).collect();
        Self {
            client,
            candidates,
            bound: Mutex::new(None),
            description: "Browser automation tool using MCP server for web navigation, \
                          screenshots, clicking, typing, and more"
                .to_string(),
            parameters: vec![
                ToolParameter::required(
                    "action",
                    ParameterType::String,
                    format!("Browser action to perform: {}", actions.join(", ")),
                ),
                ToolParameter::optional("url", ParameterType::String, "URL to navigate to", None),
                ToolParameter::optional(
                    "selector",
                    ParameterType::String,
                    "CSS selector of the element to act on",
                    None,
                ),
                ToolParameter::optional("text", ParameterType::String, "Text to type", None),
                ToolParameter::optional(
                    "wait_for",
                    ParameterType::String,
                    "Element or condition to wait for",
                    None,
                ),
                ToolParameter::optional(
                    "full_page",
                    ParameterType::Boolean,
                    "Capture the whole page in a screenshot",
                    Some(json!(false)),
                ),
                ToolParameter::optional(
                    "timeout",
                    ParameterType::Integer,
                    "Wait timeout in milliseconds",
                    None,
                ),
                ToolParameter::optional(
                    "direction",
                    ParameterType::String,
                    "Scroll direction",
                    None,
                ),
                ToolParameter::optional("amount", ParameterType::Integer, "Scroll amount", None),
            ],
        }
    }

    pub fn from_settings(client: Arc<McpClient>, settings: &Settings) -> Self {
        Self::new(client, browser_candidates(settings))
    }

    /// Name of the server this tool is bound to, if any
    pub async fn bound_server(&self) -> Option<String> {
        self.bound.lock().await.clone()
    }

    async fn ensure_bound(&self) -> Option<String> {
        let mut bound = self.bound.lock().await;
        if let Some(server) = bound.as_ref() {
            if self.client.is_connected(server).await {
                return Some(server.clone());
            }
            // The bound session died; relaunch it before trying other candidates
            if self.client.connect(server).await {
                info!(server = %server, "reconnected to browser server");
                return Some(server.clone());
            }
        }

        for candidate in &self.candidates {
            self.client
                .add_server_config(candidate.clone().enabled(true))
                .await;
            if self.client.connect(&candidate.name).await {
                info!(server = %candidate.name, "connected to browser server");
                *bound = Some(candidate.name.clone());
                return bound.clone();
            }
        }
        warn!("No browser MCP server could be connected");
        *bound = None;
        None
    }

    async fn resolve(&self, server: &str, action: BrowserAction) -> Option<RemoteTool> {
        let tools = self.client.tools_for_server(server).await;
        for name in action.tool_names() {
            if let Some(tool) = tools.iter().find(|t| t.raw_name == name) {
                return Some(tool.clone());
            }
            let suffix = format!("_{}", name);
            if let Some(tool) = tools.iter().find(|t| t.raw_name.ends_with(&suffix)) {
                return Some(tool.clone());
            }
        }
        None
    }

    fn parse_action(arguments: &Value) -> AgentResult<BrowserAction> {
        let action = str_arg(arguments, "action").ok_or_else(|| {
            AgentError::InvalidParameters("Required parameter 'action' is missing".to_string())
        })?;
        BrowserAction::from_str(action)
            .map_err(|_| AgentError::InvalidParameters(format!("Unknown browser action: {}", action)))
    }
}

#[async_trait]
impl AgentTool for BrowserTool {
    fn name(&self) -> &str {
        "browser_automation"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    fn validate(&self, arguments: &Value) -> AgentResult<()> {
        let action = Self::parse_action(arguments)?;
        action.arguments(arguments).map(|_| ())
    }

    async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
        let action = Self::parse_action(&arguments)?;
        let call_arguments = action.arguments(&arguments)?;

        let Some(server) = self.ensure_bound().await else {
            return Ok(ToolResult::failure("Browser MCP server not available"));
        };
        let Some(tool) = self.resolve(&server, action).await else {
            return Ok(ToolResult::failure(format!(
                "Browser action failed: server '{}' has no tool for action '{}'",
                server, action
            )));
        };

        let result = match self.client.call_tool(&tool.name, call_arguments).await {
            Ok(result) if result.is_error => ToolResult::failure(format!(
                "Browser action failed: {}",
                result.text()
            )),
            Ok(result) => ToolResult::success(result.text()),
            Err(e) => {
                warn!(action = %action, error = %e, "browser action failed");
                ToolResult::failure(format!("Browser action failed: {}", e))
            }
        };
        Ok(result
            .with_meta("action", json!(action.to_string()))
            .with_meta("server", json!(server))
            .with_meta("tool", json!(tool.name)))
    }

    /// Disconnect the bound server only; the client stays usable
    async fn cleanup(&self) {
        let server = self.bound.lock().await.take();
        if let Some(server) = server {
            self.client.disconnect(&server).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_action_parsing() {
        assert_eq!(
            BrowserAction::from_str("get_content").unwrap(),
            BrowserAction::GetPageContent
        );
        assert_eq!(BrowserAction::GetPageContent.to_string(), "get_page_content");
        assert_eq!(BrowserAction::FindElement.to_string(), "find_element");
        assert!(BrowserAction::from_str("teleport").is_err());
        assert_eq!(BrowserAction::iter().count(), 12);
    }

    #[test]
    fn test_argument_mapping() {
        let args = BrowserAction::Navigate
            .arguments(&json!({"url": "https://example.com", "wait_for": "#main"}))
            .unwrap();
        assert_eq!(args, json!({"url": "https://example.com", "waitFor": "#main"}));

        let args = BrowserAction::Wait
            .arguments(&json!({"wait_for": ".ready", "timeout": 5000}))
            .unwrap();
        assert_eq!(args, json!({"selector": ".ready", "timeout": 5000}));

        let args = BrowserAction::Screenshot
            .arguments(&json!({"full_page": true}))
            .unwrap();
        assert_eq!(args, json!({"fullPage": true}));

        assert_eq!(BrowserAction::Back.arguments(&json!({})).unwrap(), json!({}));
    }

    #[test]
    fn test_missing_action_arguments() {
        let error = BrowserAction::Type
            .arguments(&json!({"selector": "#q"}))
            .unwrap_err();
        assert_eq!(
            error,
            AgentError::InvalidParameters(
                "Browser action 'type' requires parameter 'text'".to_string()
            )
        );
        assert!(BrowserAction::Click.arguments(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_validation_happens_before_connecting() {
        let client = Arc::new(McpClient::new(Duration::from_secs(1)));
        let tool = BrowserTool::new(
            client.clone(),
            vec![ServerConfig::new("ghost", "definitely-missing-browser-server", ["x"])],
        );

        let error = tool.execute(json!({"action": "teleport"})).await.unwrap_err();
        assert_eq!(
            error,
            AgentError::InvalidParameters("Unknown browser action: teleport".to_string())
        );
        assert!(tool.validate(&json!({"action": "navigate"})).is_err());
        // Nothing was registered, so nothing was attempted
        assert!(client.server_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_server_available() {
        let client = Arc::new(McpClient::new(Duration::from_secs(1)));
        let tool = BrowserTool::new(
            client,
            vec![ServerConfig::new("ghost", "definitely-missing-browser-server", ["x"])],
        );
        let result = tool
            .execute(json!({"action": "navigate", "url": "https://example.com"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Browser MCP server not available"));
        tool.cleanup().await;
        tool.cleanup().await;
    }
}
