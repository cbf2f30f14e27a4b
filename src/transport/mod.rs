// ABOUTME: Capability-set transport abstraction for stdio/HTTP/WebSocket
// ABOUTME: Transports are values satisfying start/stop/health, dispatched by tagged variant
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod http;
pub mod stdio;
pub mod websocket;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};

/// A boxed async handler invoked for every inbound JSON-RPC request or
/// notification, shared across all transports so request handling logic
/// lives in one place (the MCP Server/Router).
pub type RequestHandler =
    Arc<dyn Fn(JsonRpcRequest) -> Pin<Box<dyn Future<Output = Option<JsonRpcResponse>> + Send>> + Send + Sync>;

/// Builds a fresh [`RequestHandler`] bound to a new session. Used by
/// transports that multiplex many long-lived connections (WebSocket), where
/// each accepted connection should get its own session rather than sharing
/// one across every client.
pub type HandlerFactory = Arc<dyn Fn() -> RequestHandler + Send + Sync>;

/// Pushes an unsolicited server-to-client notification (e.g.
/// `notifications/tools.listChanged`) to every client currently connected
/// through a transport. HTTP has no persistent connection to push over and
/// does not implement this.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `notification` to every currently connected client.
    ///
    /// # Errors
    /// Propagates a transport-level write failure.
    async fn notify(&self, notification: &JsonRpcRequest) -> crate::errors::GateResult<()>;
}

/// Health snapshot returned by a transport.
#[derive(Debug, Clone, Default)]
pub struct TransportHealth {
    /// Whether the transport is currently accepting traffic.
    pub healthy: bool,
    /// Human-readable detail, e.g. connection count.
    pub detail: String,
}

/// The capability set every transport implements: a value satisfying
/// start/stop/health, selected by tagged variant at construction rather than
/// by subclassing.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Begin accepting connections/input.
    async fn start(&self) -> crate::errors::GateResult<()>;
    /// Stop accepting new work; cancel pending requests with
    /// [`crate::errors::GateError::Transport`]`("transport stopped")`.
    async fn stop(&self) -> crate::errors::GateResult<()>;
    /// Current health.
    async fn health(&self) -> TransportHealth;
}
