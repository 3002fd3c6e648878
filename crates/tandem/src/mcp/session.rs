use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{McpError, McpResult};
use super::protocol::{
    self, classify, id_matches, CallToolResult, Inbound, ListToolsResult, ToolInfo,
    METHOD_NOT_FOUND,
};
use super::ServerConfig;
use crate::tools::process::kill_process_tree;

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Both halves of the byte stream plus the request counter
struct Channel {
    lines: Lines<BufReader<Reader>>,
    writer: Writer,
    next_id: u64,
}

impl Channel {
    async fn write(&mut self, server: &str, message: &Value) -> McpResult<()> {
        let mut encoded = serde_json::to_string(message).map_err(|source| McpError::InvalidJson {
            server: server.to_string(),
            source,
        })?;
        encoded.push('\n');
        let transport = |e: std::io::Error| McpError::Transport {
            server: server.to_string(),
            message: e.to_string(),
        };
        self.writer
            .write_all(encoded.as_bytes())
            .await
            .map_err(transport)?;
        self.writer.flush().await.map_err(transport)
    }

    /// Send request `id` and read until its response arrives.
    ///
    /// Server requests met on the way are answered and notifications or
    /// non-JSON lines are skipped.
    async fn exchange(
        &mut self,
        server: &str,
        id: u64,
        method: &str,
        params: Value,
    ) -> McpResult<Value> {
        self.write(server, &protocol::request(id, method, params))
            .await?;

        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| McpError::Transport {
                    server: server.to_string(),
                    message: e.to_string(),
                })?
                .ok_or_else(|| McpError::Terminated {
                    server: server.to_string(),
                })?;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value = match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => value,
                Err(_) => {
                    debug!(server, line = trimmed, "skipping non-JSON line from MCP server");
                    continue;
                }
            };

            match classify(value) {
                Inbound::Response { id: response_id, payload } => {
                    if !id_matches(&response_id, id) {
                        debug!(server, %response_id, "ignoring response to another request");
                        continue;
                    }
                    if let Some(error) = payload.get("error") {
                        return Err(McpError::Rpc {
                            server: server.to_string(),
                            code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                            message: error
                                .get("message")
                                .and_then(Value::as_str)
                                .unwrap_or("unknown error")
                                .to_string(),
                        });
                    }
                    return Ok(payload.get("result").cloned().unwrap_or(Value::Null));
                }
                Inbound::Request {
                    id: request_id,
                    method,
                } => {
                    let reply = if method == "ping" {
                        protocol::response(request_id, json!({}))
                    } else {
                        warn!(server, method = %method, "server sent unsupported request");
                        protocol::error_response(
                            request_id,
                            METHOD_NOT_FOUND,
                            &format!("client does not implement method '{}'", method),
                        )
                    };
                    self.write(server, &reply).await?;
                }
                Inbound::Notification { method } => {
                    debug!(server, method = %method, "received notification from server");
                }
                Inbound::Other => {}
            }
        }
    }
}

/// A live connection to one provider process.
///
/// Requests are serialized over the channel. A request that fails at the
/// transport level or outlives the timeout closes the session and kills the
/// process.
pub struct McpSession {
    server: String,
    channel: Mutex<Option<Channel>>,
    child: Mutex<Option<Child>>,
    timeout: Duration,
}

impl McpSession {
    /// Wrap an already-open byte stream. The handshake is not performed.
    pub fn from_transport<R, W>(server: &str, reader: R, writer: W, timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Reader = Box::new(reader);
        Self {
            server: server.to_string(),
            channel: Mutex::new(Some(Channel {
                lines: BufReader::new(reader).lines(),
                writer: Box::new(writer),
                next_id: 1,
            })),
            child: Mutex::new(None),
            timeout,
        }
    }

    /// Launch the configured process and perform the initialize handshake
    pub async fn spawn(config: &ServerConfig, timeout: Duration) -> McpResult<Self> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(env) = &config.env {
            command.envs(env);
        }

        let mut child = command.spawn().map_err(|source| McpError::Spawn {
            server: config.name.clone(),
            source,
        })?;
        let missing_pipe = |pipe: &str| McpError::Transport {
            server: config.name.clone(),
            message: format!("failed to capture server {}", pipe),
        };
        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;

        let session = Self::from_transport(&config.name, stdout, stdin, timeout);
        *session.child.lock().await = Some(child);

        if let Err(e) = session.initialize().await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Run the `initialize` exchange followed by the `initialized` notification
    pub async fn initialize(&self) -> McpResult<Value> {
        let result = self
            .request("initialize", protocol::initialize_params())
            .await?;
        let server_name = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(server = %self.server, server_name, "initialized MCP session");
        self.notify("notifications/initialized", json!({})).await?;
        Ok(result)
    }

    pub async fn request(&self, method: &str, params: Value) -> McpResult<Value> {
        let mut guard = self.channel.lock().await;
        let channel = guard.as_mut().ok_or_else(|| McpError::Terminated {
            server: self.server.clone(),
        })?;
        let id = channel.next_id;
        channel.next_id += 1;

        let outcome = tokio::time::timeout(
            self.timeout,
            channel.exchange(&self.server, id, method, params),
        )
        .await;

        let error = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if !e.is_fatal() => return Err(e),
            Ok(Err(e)) => e,
            Err(_) => McpError::Timeout {
                server: self.server.clone(),
                method: method.to_string(),
                timeout: self.timeout,
            },
        };

        warn!(server = %self.server, method, error = %error, "closing MCP session");
        guard.take();
        drop(guard);
        self.kill_child().await;
        Err(error)
    }

    pub async fn notify(&self, method: &str, params: Value) -> McpResult<()> {
        let mut guard = self.channel.lock().await;
        let channel = guard.as_mut().ok_or_else(|| McpError::Terminated {
            server: self.server.clone(),
        })?;
        channel
            .write(&self.server, &protocol::notification(method, params))
            .await
    }

    /// Every tool the server advertises, following pagination
    pub async fn list_tools(&self) -> McpResult<Vec<ToolInfo>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({"cursor": cursor}),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult =
                serde_json::from_value(result).map_err(|source| McpError::InvalidJson {
                    server: self.server.clone(),
                    source,
                })?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next)
                }
                _ => break,
            }
        }
        Ok(tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        let arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };
        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        Ok(CallToolResult::from_value(&result))
    }

    pub async fn is_open(&self) -> bool {
        self.channel.lock().await.is_some()
    }

    /// Close the channel and end the process. Safe to call repeatedly.
    pub async fn close(&self) {
        // Dropping the writer closes the server's stdin
        self.channel.lock().await.take();
        self.kill_child().await;
    }

    /// Kill the process tree first: launchers like `npx` leave the real
    /// server as a grandchild.
    async fn kill_child(&self) {
        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            if let Some(pid) = child.id() {
                let killed = tokio::task::spawn_blocking(move || kill_process_tree(pid)).await;
                if let Err(err) = killed {
                    warn!(server = %self.server, %err, "process tree kill task failed");
                }
            }
            if let Err(err) = child.kill().await {
                debug!(
                    server = %self.server,
                    %err,
                    "failed to kill MCP server process (may have already exited)"
                );
            }
        }
    }
}
