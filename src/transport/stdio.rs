// ABOUTME: Newline-delimited JSON-RPC over stdin/stdout
// ABOUTME: sendRequest (proxy -> client) is unsupported without an external correlation layer
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::{GateError, GateResult};

use super::{NotificationSink, RequestHandler, Transport, TransportHealth};

/// Reads newline-delimited JSON-RPC messages from stdin and writes
/// responses to stdout, one message per line.
///
/// `sendRequest` (proxy-initiated requests to the client) has no
/// correlation layer here; backends reached over stdio use their own
/// connection in [`crate::proxy::client_manager`], which does implement
/// request/response correlation.
pub struct StdioTransport {
    handler: RequestHandler,
    running: Arc<AtomicBool>,
    stdout: Mutex<tokio::io::Stdout>,
}

impl StdioTransport {
    /// Construct a stdio transport dispatching to `handler`.
    #[must_use]
    pub fn new(handler: RequestHandler) -> Self {
        Self {
            handler,
            running: Arc::new(AtomicBool::new(false)),
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }

    /// Send an unsolicited notification (e.g.
    /// `notifications/tools.listChanged`) to the client.
    ///
    /// # Errors
    /// Propagates any I/O failure writing to stdout.
    pub async fn send_notification(&self, notification: &crate::jsonrpc::JsonRpcRequest) -> GateResult<()> {
        let mut line = serde_json::to_string(notification)?;
        line.push('\n');
        self.stdout.lock().await.write_all(line.as_bytes()).await.map_err(GateError::from)
    }

    async fn run(&self) {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        while self.running.load(Ordering::SeqCst) {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "stdio read failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let request: Result<crate::jsonrpc::JsonRpcRequest, _> = serde_json::from_str(&line);
            let response = match request {
                Ok(request) => (self.handler)(request).await,
                Err(err) => Some(crate::jsonrpc::JsonRpcResponse::error(
                    None,
                    crate::jsonrpc::error_codes::PARSE_ERROR,
                    err.to_string(),
                )),
            };

            if let Some(response) = response {
                if let Ok(mut out) = serde_json::to_string(&response) {
                    out.push('\n');
                    if let Err(err) = self.stdout.lock().await.write_all(out.as_bytes()).await {
                        warn!(error = %err, "stdio write failed");
                        break;
                    }
                }
            }
        }
        debug!("stdio transport loop ended");
    }
}

#[async_trait::async_trait]
impl NotificationSink for StdioTransport {
    async fn notify(&self, notification: &crate::jsonrpc::JsonRpcRequest) -> GateResult<()> {
        self.send_notification(notification).await
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn start(&self) -> GateResult<()> {
        self.running.store(true, Ordering::SeqCst);
        self.run().await;
        Ok(())
    }

    async fn stop(&self) -> GateResult<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn health(&self) -> TransportHealth {
        TransportHealth { healthy: self.running.load(Ordering::SeqCst), detail: "stdio".into() }
    }
}
