//! Stdio transport MCP client
//!
//! Spawns the server as a child process and exchanges newline-delimited
//! JSON-RPC messages over its stdin/stdout. The server's stderr is passed
//! through to ours.

use async_trait::async_trait;
use mcp_core::jsonrpc::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use mcp_core::{RequestId, methods};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{McpSession, RequestCounter, Transport, rpc_result};
use crate::Result;
use crate::config::MCPServerConfig;
use crate::error::MCPError;

/// How long a server gets to exit on its own after stdin closes
const EXIT_GRACE: Duration = Duration::from_millis(500);

/// MCP client using stdio transport
pub type StdioMCPClient = McpSession<StdioTransport>;

impl StdioMCPClient {
    /// Create a client for `command args`; nothing is spawned until `initialize`
    pub fn stdio(
        command: impl Into<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
        cwd: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        McpSession::new(StdioTransport::new(command, args, env, cwd), timeout)
    }

    /// Create from MCPServerConfig
    pub fn from_config(config: &MCPServerConfig) -> Result<Self> {
        match config {
            MCPServerConfig::Stdio {
                command,
                args,
                env,
                cwd,
                ..
            } => Ok(Self::stdio(
                command.clone(),
                args.clone(),
                env.clone(),
                cwd.clone(),
                config.timeout(),
            )),
            _ => Err(MCPError::ConfigError(
                "Expected Stdio transport config".to_string(),
            )),
        }
    }
}

/// Child process plus the two pipes used to talk to it
struct StdioChannel {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

fn broken_pipe(e: std::io::Error) -> MCPError {
    MCPError::ConnectionFailed(format!("stdio channel broken: {e}"))
}

impl StdioChannel {
    async fn send(&mut self, message: &impl Serialize) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await.map_err(broken_pipe)?;
        self.stdin.flush().await.map_err(broken_pipe)
    }

    /// Read lines until the response carrying `id` shows up
    ///
    /// Notifications, stale responses and non-JSON noise are skipped; server
    /// pings are answered in place.
    async fn receive(&mut self, id: &RequestId) -> Result<JsonRpcResponse> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(broken_pipe)?
                .ok_or_else(|| MCPError::ConnectionFailed("Server closed connection".to_string()))?;

            if line.trim().is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_str(&line) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping non-JSON output from server: {}", e);
                    continue;
                }
            };

            match JsonRpcMessage::from_value(value) {
                Ok(JsonRpcMessage::Response(response)) if response.id.as_ref() == Some(id) => {
                    return Ok(response);
                }
                Ok(JsonRpcMessage::Response(response)) => {
                    debug!("Skipping response for {:?} while waiting on {}", response.id, id);
                }
                Ok(JsonRpcMessage::Request(request)) => self.answer(request).await?,
                Ok(JsonRpcMessage::Notification(notification)) => {
                    debug!("Server notification: {}", notification.method);
                }
                Err(e) => warn!("Skipping malformed message from server: {}", e),
            }
        }
    }

    async fn answer(&mut self, request: JsonRpcRequest) -> Result<()> {
        let Some(id) = request.id else {
            return Ok(());
        };

        let response = if request.method == methods::PING {
            JsonRpcResponse::success(id, json!({}))
        } else {
            debug!("Declining server request: {}", request.method);
            JsonRpcResponse::failure(Some(id), JsonRpcError::method_not_found(&request.method))
        };
        self.send(&response).await
    }
}

/// Newline-delimited JSON-RPC over a child process's stdin/stdout
///
/// One mutex owns both pipes, so a request and its response are exchanged
/// without another request interleaving on the channel.
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    channel: Mutex<Option<StdioChannel>>,
    request_ids: RequestCounter,
}

impl StdioTransport {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
        cwd: Option<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            env,
            cwd,
            channel: Mutex::new(None),
            request_ids: RequestCounter::default(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// OS process id of the running server, if spawned
    pub async fn pid(&self) -> Option<u32> {
        self.channel
            .lock()
            .await
            .as_ref()
            .and_then(|channel| channel.child.id())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn open(&self) -> Result<()> {
        let mut channel = self.channel.lock().await;
        if channel.is_some() {
            return Ok(());
        }

        debug!("Starting MCP server: {} {:?}", self.command, self.args);

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| {
            MCPError::ConnectionFailed(format!("Failed to spawn '{}': {}", self.command, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MCPError::ConnectionFailed("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MCPError::ConnectionFailed("Failed to get stdout".to_string()))?;

        info!("Spawned MCP server '{}' (pid {:?})", self.command, child.id());

        *channel = Some(StdioChannel {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        });
        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_ids.next();
        let request = JsonRpcRequest::new(id.clone(), method, params);

        let mut guard = self.channel.lock().await;
        let channel = guard
            .as_mut()
            .ok_or_else(|| MCPError::ConnectionFailed("stdio channel is not open".to_string()))?;

        debug!("Sending request {}: {}", id, method);
        channel.send(&request).await?;
        let response = channel.receive(&id).await?;
        drop(guard);

        rpc_result(method, response)
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let mut guard = self.channel.lock().await;
        let channel = guard
            .as_mut()
            .ok_or_else(|| MCPError::ConnectionFailed("stdio channel is not open".to_string()))?;

        channel
            .send(&JsonRpcRequest::notification(method, params))
            .await
    }

    async fn shutdown(&self) {
        let Some(channel) = self.channel.lock().await.take() else {
            return;
        };

        let StdioChannel {
            mut child,
            stdin,
            stdout,
        } = channel;
        // EOF on stdin is the server's cue to exit
        drop(stdin);
        drop(stdout);

        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!("MCP server '{}' exited: {}", self.command, status),
            _ => {
                debug!("Killing MCP server '{}'", self.command);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill MCP server '{}': {}", self.command, e);
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("stdio:{}", self.command)
    }
}
