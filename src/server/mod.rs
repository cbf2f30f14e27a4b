// ABOUTME: MCP Server / Router: initialize/tools.list/tools.call dispatch, built-in tools
// ABOUTME: Also schedules the periodic TTL sweep + LRU enforcement task
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod builtins;
pub mod sweep;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::discovery::GatingService;
use crate::errors::{GateError, GateResult};
use crate::events::{Event, EventBus};
use crate::gate::ToolGateController;
use crate::jsonrpc::{error_codes, JsonRpcRequest, JsonRpcResponse};
use crate::proxy::ProxyService;
use crate::session::{ClientInfo, SessionManager, TransportKind};
use crate::tools::{FilterContext, ToolRepository};
use crate::transport::{HandlerFactory, NotificationSink, RequestHandler};

pub use builtins::BuiltinTool;

fn protocol_version() -> Value {
    json!({ "major": 2024, "minor": 11, "patch": 5 })
}

fn server_capabilities() -> Value {
    json!({
        "logging": { "level": "info" },
        "tools": { "listChanged": true },
        "resources": { "listChanged": false, "subscribe": false },
        "prompts": { "listChanged": false },
    })
}

/// Routes inbound JSON-RPC methods to the Gate Controller, Proxy Service,
/// and built-in tool handlers.
pub struct McpRouter {
    repository: Arc<tokio::sync::Mutex<ToolRepository>>,
    gate: Arc<ToolGateController>,
    gating: Arc<GatingService>,
    proxy: Arc<ProxyService>,
    sessions: Arc<SessionManager>,
    events: EventBus,
    sinks: tokio::sync::Mutex<Vec<Arc<dyn NotificationSink>>>,
}

impl McpRouter {
    /// Construct a router wired to its collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<tokio::sync::Mutex<ToolRepository>>,
        gate: Arc<ToolGateController>,
        gating: Arc<GatingService>,
        proxy: Arc<ProxyService>,
        sessions: Arc<SessionManager>,
        events: EventBus,
    ) -> Self {
        Self { repository, gate, gating, proxy, sessions, events, sinks: tokio::sync::Mutex::new(Vec::new()) }
    }

    /// Shared event bus, for transports that forward
    /// `notifications/tools.listChanged`.
    #[must_use]
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Register a transport's push channel so gate state changes reach it as
    /// `notifications/tools.listChanged`. HTTP has no persistent connection
    /// and is never registered.
    pub async fn register_notification_sink(&self, sink: Arc<dyn NotificationSink>) {
        self.sinks.lock().await.push(sink);
    }

    /// Spawn a background task that forwards every toolset activation/
    /// deactivation event (manual, auto-enabled, or TTL/LRU swept) to the
    /// registered transport sinks as a `notifications/tools.listChanged`
    /// push. Independent of the request/response path so background sweep
    /// evictions reach connected clients too.
    pub fn spawn_notification_bridge(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let router = self.clone();
        let mut rx = router.events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Event::GateAutoEnable { .. })
                    | Ok(Event::GateAutoDisableTtl { .. })
                    | Ok(Event::GateAutoDisableLru { .. }) => router.notify_tools_changed().await,
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Build a [`RequestHandler`] bound to a single, pre-created session.
    /// Suitable for transports with exactly one logical client connection
    /// (stdio, or an HTTP deployment fronting a single agent).
    pub async fn into_single_session_handler(self: Arc<Self>, transport: TransportKind) -> RequestHandler {
        let session = self.sessions.create(transport).await;
        let router = self;
        Arc::new(move |request: JsonRpcRequest| {
            let router = router.clone();
            let session_id = session.id;
            Box::pin(async move { router.dispatch(session_id, request).await })
                as Pin<Box<dyn Future<Output = Option<JsonRpcResponse>> + Send>>
        })
    }

    /// Build a [`HandlerFactory`] that creates a fresh session for each new
    /// connection (WebSocket). The session is created lazily, on the first
    /// request handled by the returned [`RequestHandler`], since connection
    /// acceptance and session creation both need to happen per-connection.
    #[must_use]
    pub fn handler_factory(self: Arc<Self>, transport: TransportKind) -> HandlerFactory {
        let router = self;
        Arc::new(move || {
            let router = router.clone();
            let session_id: Arc<tokio::sync::OnceCell<Uuid>> = Arc::new(tokio::sync::OnceCell::new());
            Arc::new(move |request: JsonRpcRequest| {
                let router = router.clone();
                let session_id = session_id.clone();
                Box::pin(async move {
                    let id = *session_id
                        .get_or_init(|| async { router.sessions.create(transport).await.id })
                        .await;
                    router.dispatch(id, request).await
                }) as Pin<Box<dyn Future<Output = Option<JsonRpcResponse>> + Send>>
            })
        })
    }

    /// Dispatch a single request on behalf of `session_id`.
    pub async fn dispatch(&self, session_id: Uuid, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        let is_notification = request.is_notification();

        let result = self.dispatch_inner(session_id, &request).await;

        if is_notification {
            return None;
        }
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::from_gate_error(id, &err),
        })
    }

    async fn dispatch_inner(&self, session_id: Uuid, request: &JsonRpcRequest) -> GateResult<Value> {
        if request.method == "initialize" {
            return self.handle_initialize(session_id, request).await;
        }

        let session = self
            .sessions
            .touch(session_id)
            .await
            .ok_or(GateError::NotInitialized)?;
        if !session.is_initialized {
            return Err(GateError::NotInitialized);
        }

        match request.method.as_str() {
            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request).await,
            other => Err(GateError::MethodNotFound(other.to_owned())),
        }
    }

    async fn handle_initialize(&self, session_id: Uuid, request: &JsonRpcRequest) -> GateResult<Value> {
        let client_info = request
            .params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .map(|c| ClientInfo {
                name: c.get("name").and_then(Value::as_str).unwrap_or_default().to_owned(),
                version: c.get("version").and_then(Value::as_str).unwrap_or_default().to_owned(),
            })
            .unwrap_or_else(|| ClientInfo { name: String::new(), version: String::new() });

        self.sessions.initialize(session_id, client_info).await;

        Ok(json!({
            "protocolVersion": protocol_version(),
            "capabilities": server_capabilities(),
            "serverInfo": { "name": crate::constants::SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        }))
    }

    async fn handle_tools_list(&self) -> GateResult<Value> {
        let ctx = FilterContext::default();
        let active = self.gate.available_tools(&ctx).await;

        let mut tools: Vec<Value> = builtins::builtin_descriptors()
            .into_iter()
            .map(|t| json!({"name": t.name, "description": t.description, "inputSchema": t.input_schema}))
            .collect();
        for (_, tool) in &active {
            tools.push(json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            }));
        }
        Ok(json!(tools))
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> GateResult<Value> {
        let params = request.params.clone().unwrap_or(Value::Null);
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GateError::InvalidInput("missing tool name".into()))?
            .to_owned();
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        if let Some(builtin) = BuiltinTool::from_name(&name) {
            return self.call_builtin(builtin, arguments).await;
        }

        let ctx = FilterContext::default();
        let available = self.gate.ensure_tool_available(&name, &ctx).await?;
        if !available {
            return Err(GateError::not_found("tool", name));
        }

        let result = self.proxy.call_tool(&name, arguments).await?;
        self.gate.mark_used(&name).await;
        Ok(result)
    }

    async fn call_builtin(&self, tool: BuiltinTool, args: Value) -> GateResult<Value> {
        use BuiltinTool::*;
        match tool {
            SystemInfo => Ok(json!({
                "version": env!("CARGO_PKG_VERSION"),
                "runtime": "tokio",
            })),
            SystemHealth => Ok(json!({ "healthy": true })),
            ToolsList => self.handle_tools_list().await,
            ToolsSchema => {
                let name = args.get("name").and_then(Value::as_str).ok_or_else(|| {
                    GateError::InvalidInput("missing name".into())
                })?;
                let repo = self.repository.lock().await;
                let tool = repo.get(name).ok_or_else(|| GateError::not_found("tool", name))?;
                Ok(json!({ "name": tool.name, "description": tool.description, "inputSchema": tool.input_schema }))
            }
            DiscoverTools => {
                let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
                let limit = args.get("limit").and_then(Value::as_i64).unwrap_or(i64::MAX);
                let found = self.gating.discover(query, limit).await;
                Ok(json!(found
                    .into_iter()
                    .map(|d| json!({ "name": d.tool.name, "description": d.tool.description, "score": d.score }))
                    .collect::<Vec<_>>()))
            }
            ProvisionTools => {
                let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
                let max_tokens = args.get("maxTokens").and_then(Value::as_f64).unwrap_or(0.0);
                let selected = self.gating.provision(query, max_tokens).await;
                Ok(json!(selected
                    .into_iter()
                    .map(|t| json!({ "name": t.name, "description": t.description }))
                    .collect::<Vec<_>>()))
            }
            GateDiscoverToolsets => {
                Ok(json!({ "toolsets": self.gate.list_toolsets().await }))
            }
            GateEnableToolset => {
                let name = builtins::require_name(&args)?;
                let tools = self.gate.enable_toolset(&name).await?;
                self.notify_tools_changed().await;
                Ok(json!({ "tools": tools }))
            }
            GateDisableToolset => {
                let name = builtins::require_name(&args)?;
                let tools = self.gate.disable_toolset(&name).await?;
                self.notify_tools_changed().await;
                Ok(json!({ "tools": tools }))
            }
            GateListActiveTools => {
                let ctx = FilterContext::default();
                let active = self.gate.available_tools(&ctx).await;
                Ok(json!({ "tools": active.keys().cloned().collect::<Vec<_>>() }))
            }
            GatePinToolset => {
                let name = builtins::require_name(&args)?;
                self.gate.pin(&name).await;
                Ok(json!({}))
            }
            GateUnpinToolset => {
                let name = builtins::require_name(&args)?;
                self.gate.unpin(&name).await;
                Ok(json!({}))
            }
            GateListPinned => Ok(json!({ "toolsets": self.gate.pinned().await })),
            GateUsageStats => {
                let stats = self.gate.usage_stats().await;
                Ok(json!(stats
                    .into_iter()
                    .map(|(id, (last_used, pinned))| {
                        json!({ "id": id, "lastUsedAtMillis": last_used, "pinned": pinned })
                    })
                    .collect::<Vec<_>>()))
            }
        }
    }

    async fn notify_tools_changed(&self) {
        debug!("publishing tools.listChanged notification");
        let notification = JsonRpcRequest::notification("notifications/tools.listChanged", None);
        for sink in self.sinks.lock().await.iter() {
            if let Err(err) = sink.notify(&notification).await {
                warn!(error = %err, "failed to deliver tools.listChanged notification");
            }
        }
    }
}
