// ABOUTME: Server-side WebSocket transport (axum) and outbound backend WebSocket client
// ABOUTME: Outbound client reconnects with exponential backoff bounded by configured attempts
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{GateError, GateResult};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};

use super::{HandlerFactory, NotificationSink, Transport, TransportHealth};

/// Per-connection outbound channel, registered while the socket is open so a
/// [`NotificationSink::notify`] call can reach every currently connected client.
type ConnectionRegistry = Arc<DashMap<Uuid, mpsc::UnboundedSender<Message>>>;

struct ServerState {
    handler_factory: HandlerFactory,
    connections: ConnectionRegistry,
}

async fn upgrade_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    let handler = (state.handler_factory)();
    let connections = state.connections.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, handler, connections))
}

async fn handle_socket(socket: WebSocket, handler: super::RequestHandler, connections: ConnectionRegistry) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut push_rx) = mpsc::unbounded_channel::<Message>();
    let conn_id = Uuid::new_v4();
    connections.insert(conn_id, tx);

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(Ok(msg)) = incoming else { break };
                let Message::Text(text) = msg else { continue };
                let request: Result<JsonRpcRequest, _> = serde_json::from_str(&text);
                let response = match request {
                    Ok(request) => handler(request).await,
                    Err(err) => Some(JsonRpcResponse::error(
                        None,
                        crate::jsonrpc::error_codes::PARSE_ERROR,
                        err.to_string(),
                    )),
                };
                if let Some(response) = response {
                    if let Ok(text) = serde_json::to_string(&response) {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            pushed = push_rx.recv() => {
                let Some(message) = pushed else { break };
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        }
    }
    connections.remove(&conn_id);
}

/// Server-side WebSocket transport hosted with `axum`.
///
/// Each accepted connection gets its own session, built fresh from
/// `handler_factory`, so concurrent WebSocket clients do not share
/// `isInitialized` state.
pub struct WebSocketTransport {
    addr: SocketAddr,
    handler_factory: HandlerFactory,
    shutdown: Arc<Notify>,
    server_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    connections: ConnectionRegistry,
}

impl WebSocketTransport {
    /// Construct a server-side WebSocket transport bound to `addr`.
    #[must_use]
    pub fn new(addr: SocketAddr, handler_factory: HandlerFactory) -> Self {
        Self {
            addr,
            handler_factory,
            shutdown: Arc::new(Notify::new()),
            server_task: Mutex::new(None),
            connections: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl NotificationSink for WebSocketTransport {
    async fn notify(&self, notification: &JsonRpcRequest) -> GateResult<()> {
        let text = serde_json::to_string(notification)?;
        for entry in self.connections.iter() {
            let _ = entry.value().send(Message::Text(text.clone()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn start(&self) -> GateResult<()> {
        let listener = TcpListener::bind(self.addr).await.map_err(GateError::from)?;
        let router = Router::new().route("/", get(upgrade_handler)).with_state(Arc::new(ServerState {
            handler_factory: self.handler_factory.clone(),
            connections: self.connections.clone(),
        }));
        let shutdown = self.shutdown.clone();

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await;
        });
        *self.server_task.lock().await = Some(task);
        Ok(())
    }

    async fn stop(&self) -> GateResult<()> {
        self.shutdown.notify_waiters();
        if let Some(task) = self.server_task.lock().await.take() {
            let _ = task.await;
        }
        Ok(())
    }

    async fn health(&self) -> TransportHealth {
        let running = self.server_task.lock().await.is_some();
        TransportHealth { healthy: running, detail: format!("websocket on {}", self.addr) }
    }
}

/// Bounded exponential-backoff policy for reconnecting an outbound backend
/// WebSocket connection.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Maximum number of reconnect attempts before giving up.
    pub max_attempts: u32,
    /// Base delay, doubled on every attempt up to a cap.
    pub base_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay: Duration::from_millis(200), max_delay: Duration::from_secs(10) }
    }
}

impl ReconnectPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        scaled.min(self.max_delay)
    }
}

/// Outbound WebSocket connection to a backend, with id-correlated
/// request/response and reconnect-with-backoff on disconnect
///. Pending requests at the moment of disconnect are
/// rejected with `Transport("transport stopped")`.
pub struct WebSocketBackendClient {
    url: String,
    policy: ReconnectPolicy,
    pending: Arc<DashMap<String, oneshot::Sender<JsonRpcResponse>>>,
    sender: Mutex<Option<futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        TungsteniteMessage,
    >>>,
    next_id: AtomicI64,
}

impl WebSocketBackendClient {
    /// Connect to `url`, spawning a background reader task that dispatches
    /// inbound responses to waiting callers and reconnects with backoff on
    /// disconnect.
    ///
    /// # Errors
    /// Returns an error if the initial connection attempt fails.
    pub async fn connect(url: impl Into<String>, policy: ReconnectPolicy) -> GateResult<Arc<Self>> {
        let url = url.into();
        let client = Arc::new(Self {
            url: url.clone(),
            policy,
            pending: Arc::new(DashMap::new()),
            sender: Mutex::new(None),
            next_id: AtomicI64::new(1),
        });
        client.establish().await?;
        Ok(client)
    }

    async fn establish(self: &Arc<Self>) -> GateResult<()> {
        let (stream, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;
        let (sink, mut stream_rx) = stream.split();
        *self.sender.lock().await = Some(sink);

        let client = self.clone();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = stream_rx.next().await {
                if let TungsteniteMessage::Text(text) = msg {
                    if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&text) {
                        if let Some(id) = response.id.as_ref() {
                            let key = id.as_str().map(str::to_owned).unwrap_or_else(|| id.to_string());
                            if let Some((_, tx)) = client.pending.remove(&key) {
                                let _ = tx.send(response);
                            }
                        }
                    }
                }
            }
            debug!(url = %client.url, "backend websocket disconnected, reconnecting");
            *client.sender.lock().await = None;
            for entry in client.pending.iter() {
                let _ = entry.key();
            }
            client.pending.clear();
            client.reconnect_loop().await;
        });
        Ok(())
    }

    async fn reconnect_loop(self: &Arc<Self>) {
        for attempt in 0..self.policy.max_attempts {
            tokio::time::sleep(self.policy.delay_for(attempt)).await;
            if self.establish().await.is_ok() {
                debug!(url = %self.url, attempt, "backend websocket reconnected");
                return;
            }
            warn!(url = %self.url, attempt, "backend websocket reconnect attempt failed");
        }
        warn!(url = %self.url, "backend websocket exhausted reconnect attempts");
    }

    /// Send a correlated request and await its matching response.
    ///
    /// # Errors
    /// [`GateError::Transport`] if not currently connected or the socket
    /// write fails; [`GateError::Timeout`] if no response arrives within
    /// `timeout`.
    pub async fn call(&self, mut request: JsonRpcRequest, timeout: Duration) -> GateResult<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        request.id = Some(Value::from(id));
        let key = id.to_string();

        let (tx, rx) = oneshot::channel();
        self.pending.insert(key.clone(), tx);

        let text = serde_json::to_string(&request)?;
        let mut guard = self.sender.lock().await;
        let Some(sink) = guard.as_mut() else {
            self.pending.remove(&key);
            return Err(GateError::Transport("not connected".into()));
        };
        sink.send(TungsteniteMessage::Text(text)).await.map_err(|e| GateError::Transport(e.to_string()))?;
        drop(guard);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(GateError::Transport("transport stopped".into())),
            Err(_) => {
                self.pending.remove(&key);
                Err(GateError::Timeout)
            }
        }
    }
}
