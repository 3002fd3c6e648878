use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::Serialize;
use strum_macros::Display;
use tracing::{error, info, warn};

use crate::config::{ConfigError, Settings};
use crate::errors::ProviderResult;
use crate::mcp::{BrowserTool, McpClient, McpTool};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::{ModelInfo, Provider};
use crate::providers::factory::{get_provider, ProviderType};
use crate::session_log::{new_session_id, write_session_log, SessionLog};
use crate::tools::exa::ExaClient;
use crate::tools::{
    AgentTool, CodeExecutionTool, TerminalTool, ToolResult, WebContentTool, WebSearchTool,
};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Returned instead of model text when the loop runs out of iterations
pub const ITERATION_LIMIT_REACHED: &str = "Maximum conversation iterations reached.";

const FINAL_OPEN: &str = "<final>";
const FINAL_CLOSE: &str = "</final>";

/// Where the conversation loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum AgentState {
    Idle,
    AwaitingModel,
    ExecutingTools,
    Done,
}

/// Overrides applied on top of [`Settings`] when building an agent
#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    pub provider: Option<ProviderType>,
    pub model: Option<String>,
    pub enable_logging: Option<bool>,
    pub enable_mcp: Option<bool>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: Option<String>,
    pub model_provider: ProviderType,
    pub model_name: String,
    pub conversation_length: usize,
    pub available_tools: Vec<String>,
    pub model_info: ModelInfo,
}

/// Agent drives one conversation between a model and the tools it may call
pub struct Agent {
    provider: Box<dyn Provider>,
    tools: IndexMap<String, Box<dyn AgentTool>>,
    history: Vec<Message>,
    system_prompt: Option<String>,
    session_id: Option<String>,
    state: AgentState,
    max_iterations: usize,
    concurrent_tools: bool,
    session_log_dir: Option<PathBuf>,
    mcp: Option<Arc<McpClient>>,
}

impl Agent {
    /// Create an agent with no tools, no logging and no remote servers
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            tools: IndexMap::new(),
            history: Vec::new(),
            system_prompt: None,
            session_id: None,
            state: AgentState::Idle,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            concurrent_tools: false,
            session_log_dir: None,
            mcp: None,
        }
    }

    /// Build the standard agent: the chosen backend plus every local tool,
    /// and the browser tool when remote servers are enabled.
    pub async fn from_settings(settings: &Settings, options: AgentOptions) -> Result<Self, ConfigError> {
        let provider_type = match options.provider {
            Some(provider) => provider,
            None => settings.preferred_provider()?,
        };
        let config = settings.provider_config(provider_type, options.model.as_deref())?;
        let provider = get_provider(config)?;

        let mut agent = Agent::new(provider)
            .with_tool(Box::new(CodeExecutionTool::from_settings(settings)))
            .with_tool(Box::new(TerminalTool::from_settings(settings)));

        match ExaClient::new(&settings.exa_host, &settings.exa_api_key, settings.timeout()) {
            Ok(exa) => {
                agent = agent
                    .with_tool(Box::new(WebSearchTool::new(exa.clone())))
                    .with_tool(Box::new(WebContentTool::new(exa)));
            }
            Err(e) => warn!(error = %e, "web tools unavailable"),
        }

        if options.enable_mcp.unwrap_or(settings.enable_mcp) {
            let client = Arc::new(McpClient::from_settings(settings).await);
            agent = agent
                .with_tool(Box::new(BrowserTool::from_settings(client.clone(), settings)))
                .with_mcp_client(client);
            info!("MCP browser automation tool enabled");
        }

        if options.enable_logging.unwrap_or(settings.enable_logging) {
            agent = agent.with_session_log(settings.session_log_dir());
        }
        if let Some(prompt) = options.system_prompt {
            agent = agent.with_system_prompt(prompt);
        }
        Ok(agent)
    }

    pub fn with_tool(mut self, tool: Box<dyn AgentTool>) -> Self {
        self.add_tool(tool);
        self
    }

    /// Seed every conversation with a system message
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        let prompt = prompt.into();
        self.history.retain(|m| m.role != Role::System);
        self.history.insert(0, Message::system().with_text(prompt.clone()));
        self.system_prompt = Some(prompt);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run the tool calls of one model turn concurrently. Results are still
    /// appended in the order the model issued them.
    pub fn with_concurrent_tools(mut self, concurrent: bool) -> Self {
        self.concurrent_tools = concurrent;
        self
    }

    /// Persist the history to `{dir}/{session_id}.json` after every chat
    pub fn with_session_log<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.session_log_dir = Some(dir.into());
        self
    }

    pub fn with_mcp_client(mut self, client: Arc<McpClient>) -> Self {
        self.mcp = Some(client);
        self
    }

    /// Register a tool, replacing any tool of the same name
    pub fn add_tool(&mut self, tool: Box<dyn AgentTool>) {
        let name = tool.name().to_string();
        info!(tool = %name, "added tool");
        self.tools.insert(name, tool);
    }

    pub fn remove_tool(&mut self, name: &str) -> bool {
        let removed = self.tools.shift_remove(name).is_some();
        if removed {
            info!(tool = name, "removed tool");
        }
        removed
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn tool_schemas(&self) -> Vec<Tool> {
        self.tools.values().map(|tool| tool.schema()).collect()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Forget the conversation, keeping the system prompt and session id
    pub fn clear_history(&mut self) {
        self.history.clear();
        if let Some(prompt) = &self.system_prompt {
            self.history.push(Message::system().with_text(prompt.clone()));
        }
        self.state = AgentState::Idle;
        info!("conversation history cleared");
    }

    /// Start a fresh conversation under a new, lazily minted session id
    pub fn reset_session(&mut self) {
        self.session_id = None;
        self.clear_history();
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn session_info(&self) -> SessionInfo {
        let model_info = self.provider.info();
        SessionInfo {
            session_id: self.session_id.clone(),
            model_provider: model_info.provider,
            model_name: model_info.model_name.clone(),
            conversation_length: self.history.len(),
            available_tools: self.tool_names(),
            model_info,
        }
    }

    pub fn mcp_client(&self) -> Option<&Arc<McpClient>> {
        self.mcp.as_ref()
    }

    /// Attempt every configured remote server; empty when remote tools are off
    pub async fn connect_mcp_servers(&self) -> IndexMap<String, bool> {
        match &self.mcp {
            Some(client) => client.connect_all().await,
            None => IndexMap::new(),
        }
    }

    /// Schemas of every tool the connected servers advertise
    pub async fn mcp_tools(&self) -> Vec<Tool> {
        match &self.mcp {
            Some(client) => client.available_tools().await,
            None => Vec::new(),
        }
    }

    /// Expose every connected remote tool to the model under its qualified
    /// name. Returns how many were added.
    pub async fn register_remote_tools(&mut self) -> usize {
        let Some(client) = self.mcp.clone() else {
            return 0;
        };
        let mut added = 0;
        for remote in client.remote_tools().await {
            if self.tools.contains_key(&remote.name) {
                continue;
            }
            self.add_tool(Box::new(McpTool::new(client.clone(), remote)));
            added += 1;
        }
        added
    }

    /// Send one user message and run the loop to a final answer.
    ///
    /// Never fails: backend errors come back as apology text and the user
    /// message stays in the history so a retry continues from there.
    pub async fn chat(&mut self, text: &str) -> String {
        if self.session_id.is_none() {
            let session_id = new_session_id();
            info!(session_id = %session_id, "created new session");
            self.session_id = Some(session_id);
        }
        self.run_chat(text).await
    }

    /// Like [`Agent::chat`], adopting `session_id` for this and later turns
    pub async fn chat_in_session(&mut self, text: &str, session_id: &str) -> String {
        self.session_id = Some(session_id.to_string());
        self.run_chat(text).await
    }

    async fn run_chat(&mut self, text: &str) -> String {
        self.history.push(Message::user().with_text(text));

        let answer = match self.process_conversation().await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "chat processing failed");
                format!("Sorry, I encountered an error: {}", e)
            }
        };
        self.state = AgentState::Done;

        if self.session_log_dir.is_some() {
            self.write_log().await;
        }
        answer
    }

    async fn process_conversation(&mut self) -> ProviderResult<String> {
        let tools = self.tool_schemas();

        for _ in 0..self.max_iterations {
            self.state = AgentState::AwaitingModel;
            let response = self.provider.complete(&self.history, &tools).await?;
            self.history.push(response.to_message());

            if !response.has_tool_calls() {
                return Ok(extract_final_answer(&response.content));
            }

            self.state = AgentState::ExecutingTools;
            let results = self.execute_tool_calls(&response.tool_calls).await;
            for (call, result) in response.tool_calls.iter().zip(results) {
                self.history.push(
                    Message::tool(call.id.clone(), call.name.clone())
                        .with_text(result.to_model_text()),
                );
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            "conversation hit the iteration limit"
        );
        Ok(ITERATION_LIMIT_REACHED.to_string())
    }

    async fn execute_tool_calls(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        if self.concurrent_tools {
            let futures: Vec<_> = calls.iter().map(|call| self.execute_tool(call)).collect();
            futures::future::join_all(futures).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.execute_tool(call).await);
            }
            results
        }
    }

    /// Dispatch one call. Every failure, a panic included, becomes a failed
    /// result rather than an error.
    pub async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "model called an unknown tool");
            return ToolResult::failure(format!("Tool '{}' not found", call.name));
        };

        if let Err(e) = tool.validate(&call.arguments) {
            warn!(tool = %call.name, error = %e, "rejected tool arguments");
            return ToolResult::from(e);
        }

        let outcome = AssertUnwindSafe(tool.execute(call.arguments.clone()))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ToolResult::from(e),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool panicked".to_string());
                ToolResult::failure(format!("Tool execution failed: {}", reason))
            }
        };

        if result.success {
            info!(tool = %call.name, "tool executed successfully");
        } else {
            error!(tool = %call.name, error = ?result.error, "tool execution failed");
        }
        result
    }

    async fn write_log(&self) {
        let (Some(dir), Some(session_id)) = (&self.session_log_dir, &self.session_id) else {
            return;
        };
        let info = self.provider.info();
        let log = SessionLog {
            session_id: session_id.clone(),
            timestamp: Utc::now(),
            model_provider: info.provider,
            model_name: info.model_name,
            conversation_history: self.history.clone(),
        };
        if let Err(e) = write_session_log(dir, &log).await {
            warn!(session_id = %session_id, error = %e, "failed to write session log");
        }
    }

    /// Release remote sessions and let every tool clean up
    pub async fn cleanup(&self) {
        if let Some(client) = &self.mcp {
            client.cleanup().await;
        }
        for tool in self.tools.values() {
            tool.cleanup().await;
        }
        info!("agent cleanup completed");
    }
}

/// The text between the first `<final>`/`</final>` pair, or the whole text
/// when no complete pair is present
pub fn extract_final_answer(content: &str) -> String {
    if let Some((_, rest)) = content.split_once(FINAL_OPEN) {
        if let Some((inner, _)) = rest.split_once(FINAL_CLOSE) {
            return inner.trim().to_string();
        }
    }
    content.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AgentError, AgentResult, ProviderError};
    use crate::models::response::ModelResponse;
    use crate::providers::mock::MockProvider;
    use crate::tools::process::program_available;
    use crate::tools::{ParameterType, ToolParameter};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::tempdir;

    struct EchoTool {
        parameters: Vec<ToolParameter>,
        delay: Duration,
    }

    impl EchoTool {
        fn new() -> Self {
            Self::delayed(Duration::ZERO)
        }

        fn delayed(delay: Duration) -> Self {
            Self {
                parameters: vec![ToolParameter::required(
                    "text",
                    ParameterType::String,
                    "Text to echo",
                )],
                delay,
            }
        }
    }

    #[async_trait]
    impl AgentTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text back"
        }

        fn parameters(&self) -> &[ToolParameter] {
            &self.parameters
        }

        async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
            tokio::time::sleep(self.delay).await;
            let text = arguments["text"].as_str().unwrap_or_default();
            Ok(ToolResult::success(text))
        }
    }

    struct FaultyTool {
        panic: bool,
    }

    #[async_trait]
    impl AgentTool for FaultyTool {
        fn name(&self) -> &str {
            if self.panic {
                "panicky"
            } else {
                "faulty"
            }
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> &[ToolParameter] {
            &[]
        }

        async fn execute(&self, _arguments: Value) -> AgentResult<ToolResult> {
            if self.panic {
                panic!("something broke");
            }
            Err(AgentError::ExecutionError("disk on fire".to_string()))
        }
    }

    fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
        ToolCall::new(id, name, arguments)
    }

    fn tool_messages(agent: &Agent) -> Vec<&Message> {
        agent
            .history()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect()
    }

    #[test]
    fn test_extract_final_answer() {
        assert_eq!(extract_final_answer("  plain answer \n"), "plain answer");
        assert_eq!(
            extract_final_answer("thinking...<final> 42 </final> trailing"),
            "42"
        );
        assert_eq!(
            extract_final_answer("<final>first</final><final>second</final>"),
            "first"
        );
        assert_eq!(
            extract_final_answer("notes <final>unterminated"),
            "notes <final>unterminated"
        );
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let provider = MockProvider::new(vec![ModelResponse::text("Hello there!  \n")]);
        let mut agent = Agent::new(Box::new(provider));
        assert_eq!(agent.state(), AgentState::Idle);

        let answer = agent.chat("Hi").await;
        assert_eq!(answer, "Hello there!");
        assert_eq!(agent.state(), AgentState::Done);
        assert_eq!(agent.history().len(), 2);
        assert_eq!(agent.history()[0].role, Role::User);
        assert_eq!(agent.history()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let provider = MockProvider::new(vec![
            ModelResponse::text("").with_tool_call(call("call_1", "echo", json!({"text": "ping"}))),
            ModelResponse::text("The tool said ping"),
        ]);
        let calls = provider.calls();
        let tools_seen = provider.tools_seen();
        let mut agent = Agent::new(Box::new(provider)).with_tool(Box::new(EchoTool::new()));

        let answer = agent.chat("Echo ping").await;
        assert_eq!(answer, "The tool said ping");

        let tool_messages = tool_messages(&agent);
        assert_eq!(tool_messages.len(), 1);
        assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_messages[0].name.as_deref(), Some("echo"));
        assert_eq!(tool_messages[0].content, "ping");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        // The second request sees the assistant call and its result
        assert_eq!(calls[1].len(), 3);
        assert_eq!(tools_seen.lock().unwrap()[0], vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn test_tool_failures_are_reported_to_the_model() {
        let provider = MockProvider::new(vec![
            ModelResponse::text("")
                .with_tool_call(call("a", "nope", json!({})))
                .with_tool_call(call("b", "echo", json!({})))
                .with_tool_call(call("c", "faulty", json!({})))
                .with_tool_call(call("d", "panicky", json!({}))),
            ModelResponse::text("Recovered"),
        ]);
        let mut agent = Agent::new(Box::new(provider))
            .with_tool(Box::new(EchoTool::new()))
            .with_tool(Box::new(FaultyTool { panic: false }))
            .with_tool(Box::new(FaultyTool { panic: true }));

        assert_eq!(agent.chat("go").await, "Recovered");

        let contents: Vec<(&str, &str)> = tool_messages(&agent)
            .iter()
            .map(|m| (m.tool_call_id.as_deref().unwrap(), m.content.as_str()))
            .collect();
        assert_eq!(
            contents,
            vec![
                ("a", "Error: Tool 'nope' not found"),
                (
                    "b",
                    "Error: Invalid parameters: Required parameter 'text' is missing"
                ),
                ("c", "Error: Tool execution failed: disk on fire"),
                ("d", "Error: Tool execution failed: something broke"),
            ]
        );
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let provider = MockProvider::repeating(
            ModelResponse::text("").with_tool_call(call("loop", "echo", json!({"text": "again"}))),
        );
        let calls = provider.calls();
        let mut agent = Agent::new(Box::new(provider))
            .with_tool(Box::new(EchoTool::new()))
            .with_max_iterations(3);

        assert_eq!(agent.chat("forever").await, ITERATION_LIMIT_REACHED);
        assert_eq!(calls.lock().unwrap().len(), 3);
        assert_eq!(tool_messages(&agent).len(), 3);
    }

    #[tokio::test]
    async fn test_backend_error_keeps_user_message() {
        let provider = MockProvider::with_results(vec![
            Err(ProviderError::Status {
                backend: "openai",
                status: 500,
                body: "upstream down".to_string(),
            }),
            Ok(ModelResponse::text("Back online")),
        ]);
        let mut agent = Agent::new(Box::new(provider));

        let answer = agent.chat("hello?").await;
        assert_eq!(
            answer,
            "Sorry, I encountered an error: openai returned 500: upstream down"
        );
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history()[0].content, "hello?");

        assert_eq!(agent.chat("retry").await, "Back online");
        assert_eq!(agent.history().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_keeps_request_order() {
        let provider = MockProvider::new(vec![
            ModelResponse::text("")
                .with_tool_call(call("slow", "echo", json!({"text": "first"})))
                .with_tool_call(call("fast", "quick", json!({"text": "second"}))),
            ModelResponse::text("done"),
        ]);

        struct Quick(EchoTool);

        #[async_trait]
        impl AgentTool for Quick {
            fn name(&self) -> &str {
                "quick"
            }
            fn description(&self) -> &str {
                self.0.description()
            }
            fn parameters(&self) -> &[ToolParameter] {
                self.0.parameters()
            }
            async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
                self.0.execute(arguments).await
            }
        }

        let mut agent = Agent::new(Box::new(provider))
            .with_tool(Box::new(EchoTool::delayed(Duration::from_millis(100))))
            .with_tool(Box::new(Quick(EchoTool::new())))
            .with_concurrent_tools(true);

        assert_eq!(agent.chat("both").await, "done");
        let ids: Vec<&str> = tool_messages(&agent)
            .iter()
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_session_ids() {
        let provider = MockProvider::repeating(ModelResponse::text("ok"));
        let mut agent = Agent::new(Box::new(provider));
        assert_eq!(agent.session_id(), None);

        agent.chat("one").await;
        let first = agent.session_id().unwrap().to_string();
        assert!(first.starts_with("session_"));
        agent.chat("two").await;
        assert_eq!(agent.session_id(), Some(first.as_str()));

        agent.chat_in_session("three", "session_custom").await;
        assert_eq!(agent.session_id(), Some("session_custom"));

        agent.reset_session();
        assert_eq!(agent.session_id(), None);
        assert!(agent.history().is_empty());
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[tokio::test]
    async fn test_session_log_written_after_chat() {
        let dir = tempdir().unwrap();
        let provider = MockProvider::new(vec![ModelResponse::text("<final>4</final>")]);
        let mut agent = Agent::new(Box::new(provider)).with_session_log(dir.path());

        assert_eq!(agent.chat_in_session("2+2?", "session_test").await, "4");

        let path = dir.path().join("session_test.json");
        let log: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(log["session_id"], "session_test");
        assert_eq!(log["model_name"], "mock-model");
        assert_eq!(log["conversation_history"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_system_prompt_survives_clear() {
        let provider = MockProvider::repeating(ModelResponse::text("ok"));
        let calls = provider.calls();
        let mut agent = Agent::new(Box::new(provider)).with_system_prompt("Be brief.");

        agent.chat("hi").await;
        assert_eq!(calls.lock().unwrap()[0][0].role, Role::System);

        agent.clear_history();
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history()[0].content, "Be brief.");
    }

    #[tokio::test]
    async fn test_tool_registry() {
        let provider = MockProvider::new(vec![]);
        let mut agent = Agent::new(Box::new(provider)).with_tool(Box::new(EchoTool::new()));
        assert_eq!(agent.tool_names(), vec!["echo"]);
        assert_eq!(agent.tool_schemas()[0].required_parameters(), vec!["text"]);

        let info = agent.session_info();
        assert_eq!(info.model_name, "mock-model");
        assert_eq!(info.available_tools, vec!["echo"]);

        assert!(agent.remove_tool("echo"));
        assert!(!agent.remove_tool("echo"));
        assert!(agent.tool_schemas().is_empty());

        assert!(agent.connect_mcp_servers().await.is_empty());
        assert!(agent.mcp_tools().await.is_empty());
        assert_eq!(agent.register_remote_tools().await, 0);
        agent.cleanup().await;
    }

    #[tokio::test]
    async fn test_python_code_execution_round() {
        if !program_available("python3") {
            return;
        }
        let provider = MockProvider::new(vec![
            ModelResponse::text("").with_tool_call(call(
                "run_1",
                "code_execution",
                json!({"code": "print(2+2)", "code_type": "python"}),
            )),
            ModelResponse::text("The result is 4."),
        ]);
        let calls = provider.calls();
        let mut agent = Agent::new(Box::new(provider)).with_tool(Box::new(
            CodeExecutionTool::new(true, vec!["python".to_string()], Duration::from_secs(30)),
        ));

        let answer = agent.chat("Execute this Python code: print(2+2)").await;
        assert_eq!(answer, "The result is 4.");
        assert!(tool_messages(&agent)[0].content.contains('4'));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }
}
