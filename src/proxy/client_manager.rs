// ABOUTME: Spawns/connects backend MCP servers and routes tool calls to them
// ABOUTME: A failing backend at startup is logged and counted, never fatal to the proxy
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};

use crate::errors::{GateError, GateResult};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::tools::ToolDescriptor;

/// How a backend's transport is reached.
#[derive(Debug, Clone)]
pub enum BackendTransport {
    /// Spawn `command args...` and speak newline-delimited JSON-RPC over its
    /// stdio.
    Stdio,
    /// Connect to an HTTP endpoint, one POST per message.
    Http {
        /// Base URL the backend listens on.
        url: String,
    },
    /// Connect to a WebSocket endpoint.
    WebSocket {
        /// `ws://` or `wss://` URL the backend listens on.
        url: String,
    },
}

/// Static configuration for a single backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Unique backend name.
    pub name: String,
    /// Executable to spawn, for [`BackendTransport::Stdio`].
    pub command: Option<String>,
    /// Arguments passed to `command`.
    pub args: Vec<String>,
    /// Extra environment variables for the spawned process.
    pub env: HashMap<String, String>,
    /// How this backend is reached.
    pub transport: BackendTransport,
}

/// A live connection to a backend, able to run JSON-RPC requests against it.
#[async_trait]
trait BackendConnection: Send + Sync {
    async fn call(&self, request: JsonRpcRequest) -> GateResult<JsonRpcResponse>;
    async fn close(&self);
}

/// Backend reached over newline-delimited JSON-RPC on a spawned child
/// process's stdio. Each request is correlated by id through a pending-map
/// of oneshot senders, mirroring the reference server's backend-call pattern.
struct StdioConnection {
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    pending: Arc<dashmap::DashMap<String, oneshot::Sender<JsonRpcResponse>>>,
    next_id: AtomicI64,
    reader_task: tokio::task::JoinHandle<()>,
}

impl StdioConnection {
    async fn spawn(cfg: &BackendConfig) -> GateResult<Self> {
        let command = cfg
            .command
            .as_ref()
            .ok_or_else(|| GateError::InvalidInput("stdio backend requires a command".into()))?;

        let mut builder = Command::new(command);
        builder
            .args(&cfg.args)
            .envs(&cfg.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        let mut child = builder.spawn().map_err(GateError::from)?;
        let stdin = child.stdin.take().ok_or_else(|| GateError::Transport("no stdin".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| GateError::Transport("no stdout".into()))?;

        let pending: Arc<dashmap::DashMap<String, oneshot::Sender<JsonRpcResponse>>> =
            Arc::new(dashmap::DashMap::new());
        let pending_for_task = pending.clone();
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&line) else {
                    continue;
                };
                if let Some(id) = response.id.as_ref().and_then(Value::as_str) {
                    if let Some((_, sender)) = pending_for_task.remove(id) {
                        let _ = sender.send(response);
                    }
                } else if let Some(id) = response.id.as_ref() {
                    if let Some((_, sender)) = pending_for_task.remove(&id.to_string()) {
                        let _ = sender.send(response);
                    }
                }
            }
        });

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicI64::new(1),
            reader_task,
        })
    }
}

#[async_trait]
impl BackendConnection for StdioConnection {
    async fn call(&self, mut request: JsonRpcRequest) -> GateResult<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        request.id = Some(Value::from(id));
        let id_key = id.to_string();

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id_key.clone(), tx);

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        self.stdin.lock().await.write_all(line.as_bytes()).await.map_err(GateError::from)?;

        match tokio::time::timeout(std::time::Duration::from_secs(30), rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(GateError::Transport("backend closed connection".into())),
            Err(_) => {
                self.pending.remove(&id_key);
                Err(GateError::Timeout)
            }
        }
    }

    async fn close(&self) {
        self.reader_task.abort();
        let _ = self.child.lock().await.kill().await;
    }
}

/// Backend reached over plain HTTP, one POST per message.
struct HttpConnection {
    client: reqwest::Client,
    url: String,
}

#[async_trait]
impl BackendConnection for HttpConnection {
    async fn call(&self, request: JsonRpcRequest) -> GateResult<JsonRpcResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;
        response
            .json::<JsonRpcResponse>()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))
    }

    async fn close(&self) {}
}

/// A registered backend: its config and live connection.
struct Backend {
    config: BackendConfig,
    connection: Arc<dyn BackendConnection>,
}

/// Manages connections to backend MCP servers and routes tool calls
///.
pub struct ClientManager {
    backends: Mutex<HashMap<String, Backend>>,
    events: crate::events::EventBus,
}

impl ClientManager {
    /// Construct an empty client manager.
    #[must_use]
    pub fn new(events: crate::events::EventBus) -> Self {
        Self { backends: Mutex::new(HashMap::new()), events }
    }

    /// Connect to a backend, replacing and disconnecting any prior
    /// connection under the same name. Performs the JSON-RPC `initialize`
    /// handshake before the connection is considered ready.
    ///
    /// # Errors
    /// Returns an error if the transport cannot be established or
    /// `initialize` fails.
    pub async fn connect(&self, cfg: BackendConfig) -> GateResult<()> {
        let connection: Arc<dyn BackendConnection> = match &cfg.transport {
            BackendTransport::Stdio => Arc::new(StdioConnection::spawn(&cfg).await?),
            BackendTransport::Http { url } => {
                Arc::new(HttpConnection { client: reqwest::Client::new(), url: url.clone() })
            }
            BackendTransport::WebSocket { .. } => {
                return Err(GateError::InvalidInput(
                    "websocket backend connections are established by the websocket transport".into(),
                ));
            }
        };

        let init = JsonRpcRequest::with_id("initialize", Some(serde_json::json!({})), Value::from(0));
        connection.call(init).await?;

        let mut backends = self.backends.lock().await;
        if let Some(previous) = backends.remove(&cfg.name) {
            previous.connection.close().await;
        }
        let name = cfg.name.clone();
        backends.insert(name.clone(), Backend { config: cfg, connection });
        drop(backends);

        self.events.publish(crate::events::Event::BackendConnected { name });
        Ok(())
    }

    /// List tools a backend provides. Malformed descriptors (missing `name`
    /// or `inputSchema`) are silently skipped.
    ///
    /// # Errors
    /// [`GateError::NoConnection`] if the backend is unknown.
    pub async fn list_tools(&self, backend: &str) -> GateResult<Vec<ToolDescriptor>> {
        let connection = self.connection_for(backend).await?;
        let request =
            JsonRpcRequest::with_id("tools/list", Some(serde_json::json!({})), Value::from(0));
        let response = connection.call(request).await?;

        let Some(result) = response.result else {
            return Ok(Vec::new());
        };
        let Some(raw_tools) = result.get("tools").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        let mut tools = Vec::new();
        for raw in raw_tools {
            let Some(name) = raw.get("name").and_then(Value::as_str) else { continue };
            let Some(input_schema) = raw.get("inputSchema").cloned() else { continue };
            let description = raw.get("description").and_then(Value::as_str).unwrap_or_default();
            tools.push(ToolDescriptor::new(name, description, input_schema).with_backend(backend));
        }
        Ok(tools)
    }

    /// Execute a tool call on the named backend.
    ///
    /// # Errors
    /// [`GateError::NoConnection`] if the backend is unknown; a
    /// [`GateError::Backend`] if the backend returns an error.
    pub async fn execute_tool(&self, backend: &str, tool_name: &str, input: Value) -> GateResult<Value> {
        let connection = self.connection_for(backend).await?;
        let request = JsonRpcRequest::with_id(
            "tools/call",
            Some(serde_json::json!({ "tool": tool_name, "input": input })),
            Value::from(0),
        );
        let response = connection.call(request).await?;

        if let Some(error) = response.error {
            return Err(GateError::backend(backend, tool_name, error.message));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Idempotent teardown of a backend connection.
    pub async fn disconnect(&self, backend: &str) {
        let mut backends = self.backends.lock().await;
        if let Some(removed) = backends.remove(backend) {
            removed.connection.close().await;
            drop(backends);
            self.events.publish(crate::events::Event::BackendDisconnected { name: backend.to_owned() });
        }
    }

    /// Names of every currently connected backend.
    pub async fn connected_backends(&self) -> Vec<String> {
        self.backends.lock().await.keys().cloned().collect()
    }

    async fn connection_for(&self, backend: &str) -> GateResult<Arc<dyn BackendConnection>> {
        self.backends
            .lock()
            .await
            .get(backend)
            .map(|b| b.connection.clone())
            .ok_or_else(|| GateError::NoConnection(backend.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeConnection;

    #[async_trait]
    impl BackendConnection for FakeConnection {
        async fn call(&self, request: JsonRpcRequest) -> GateResult<JsonRpcResponse> {
            match request.method.as_str() {
                "initialize" => Ok(JsonRpcResponse::success(request.id, serde_json::json!({}))),
                "tools/list" => Ok(JsonRpcResponse::success(
                    request.id,
                    serde_json::json!({
                        "tools": [
                            {"name": "fake/tool", "description": "d", "inputSchema": {"type": "object"}},
                            {"name": "bad"},
                        ]
                    }),
                )),
                "tools/call" => Ok(JsonRpcResponse::success(request.id, serde_json::json!({"ok": true}))),
                _ => Ok(JsonRpcResponse::error(request.id, -32601, "method not found")),
            }
        }

        async fn close(&self) {}
    }

    async fn manager_with_fake_backend() -> ClientManager {
        let manager = ClientManager::new(crate::events::EventBus::default());
        let mut backends = manager.backends.lock().await;
        backends.insert(
            "fake".to_owned(),
            Backend {
                config: BackendConfig {
                    name: "fake".into(),
                    command: None,
                    args: Vec::new(),
                    env: HashMap::new(),
                    transport: BackendTransport::Stdio,
                },
                connection: Arc::new(FakeConnection),
            },
        );
        drop(backends);
        manager
    }

    #[tokio::test]
    async fn list_tools_skips_malformed_descriptors() {
        let manager = manager_with_fake_backend().await;
        let tools = manager.list_tools("fake").await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "fake/tool");
        assert_eq!(tools[0].backend.as_deref(), Some("fake"));
    }

    #[tokio::test]
    async fn execute_tool_unknown_backend_rejects() {
        let manager = ClientManager::new(crate::events::EventBus::default());
        let err = manager.execute_tool("nope", "t", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, GateError::NoConnection(_)));
    }

    #[tokio::test]
    async fn execute_tool_success() {
        let manager = manager_with_fake_backend().await;
        let result = manager.execute_tool("fake", "fake/tool", serde_json::json!({})).await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let manager = manager_with_fake_backend().await;
        manager.disconnect("fake").await;
        manager.disconnect("fake").await;
        assert!(manager.connected_backends().await.is_empty());
    }
}
