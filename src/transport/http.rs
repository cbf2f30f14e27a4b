// ABOUTME: Axum-hosted HTTP transport: one JSON-RPC message per POST
// ABOUTME: Notifications (no id) respond 204; requests respond 200 with a JSON-RPC envelope
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio::sync::{Mutex, Notify};
use tracing::info;

use crate::errors::GateResult;
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};

use super::{RequestHandler, Transport, TransportHealth};

struct AppState {
    handler: RequestHandler,
}

async fn handle_post(State(state): State<Arc<AppState>>, Json(request): Json<JsonRpcRequest>) -> Response {
    let is_notification = request.is_notification();
    match (state.handler)(request).await {
        Some(response) => Json(response).into_response(),
        None if is_notification => StatusCode::NO_CONTENT.into_response(),
        None => Json(JsonRpcResponse::error(
            None,
            crate::jsonrpc::error_codes::INTERNAL_ERROR,
            "no response produced",
        ))
        .into_response(),
    }
}

/// Hosts a local listener on `addr` and routes `POST /` to the registered
/// request handler.
pub struct HttpTransport {
    addr: SocketAddr,
    handler: RequestHandler,
    shutdown: Arc<Notify>,
    server_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl HttpTransport {
    /// Construct an HTTP transport bound to `addr`, dispatching to `handler`.
    #[must_use]
    pub fn new(addr: SocketAddr, handler: RequestHandler) -> Self {
        Self { addr, handler, shutdown: Arc::new(Notify::new()), server_task: Mutex::new(None) }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/", post(handle_post))
            .with_state(Arc::new(AppState { handler: self.handler.clone() }))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn start(&self) -> GateResult<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await.map_err(crate::errors::GateError::from)?;
        let router = self.router();
        let shutdown = self.shutdown.clone();
        info!(addr = %self.addr, "http transport listening");

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
        TransportHealth { healthy: running, detail: format!("http on {}", self.addr) }
    }
}
