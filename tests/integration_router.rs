// ABOUTME: End-to-end exercise of the MCP Server/Router over in-process JSON-RPC dispatch
// ABOUTME: No real transport socket; drives the RequestHandler returned to transports directly
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use toolgate::discovery::GatingService;
use toolgate::events::EventBus;
use toolgate::gate::{GateConfig, StaticLoader, ToolGateController, ToolsetManifest, ToolsetRegistration};
use toolgate::jsonrpc::{error_codes, JsonRpcRequest, JsonRpcResponse};
use toolgate::loadbalancer::{LoadBalancer, LoadBalancerConfig};
use toolgate::proxy::{ClientManager, ProxyService};
use toolgate::session::{SessionManager, TransportKind};
use toolgate::server::McpRouter;
use toolgate::tools::{FilterChainConfig, ToolDescriptor, ToolRepository};
use toolgate::transport::RequestHandler;

fn manifest(id: &str, tools: &[&str]) -> ToolsetManifest {
    ToolsetManifest {
        id: id.to_owned(),
        name: id.to_owned(),
        description: None,
        tools: tools.iter().map(|s| (*s).to_owned()).collect(),
    }
}

async fn build_handler(gate_config: GateConfig) -> RequestHandler {
    let repository = Arc::new(tokio::sync::Mutex::new(ToolRepository::new()));
    let events = EventBus::default();

    // Mirrors what the Client Manager would have populated after connecting
    // to each backend and listing its tools: the repository tracks every
    // known descriptor independently of which toolset is currently active.
    {
        let mut repo = repository.lock().await;
        repo.add_tool(ToolDescriptor::new(
            "weather/forecast",
            "7-day weather forecast lookup",
            json!({"type": "object", "properties": {"city": {"type": "string"}}, "required": ["city"]}),
        ))
        .unwrap();
        repo.add_tool(ToolDescriptor::new("weather/alerts", "active severe weather alerts", json!({"type": "object"})))
            .unwrap();
        repo.add_tool(ToolDescriptor::new(
            "calendar/list_events",
            "list upcoming calendar events",
            json!({"type": "object"}),
        ))
        .unwrap();
    }

    let gate = Arc::new(ToolGateController::new(gate_config, FilterChainConfig::default(), events.clone()));
    gate.register_toolset(ToolsetRegistration::new(
        "weather",
        manifest("weather", &["weather/forecast", "weather/alerts"]),
        Arc::new(StaticLoader::new([
            ToolDescriptor::new(
                "weather/forecast",
                "7-day weather forecast lookup",
                json!({"type": "object", "properties": {"city": {"type": "string"}}, "required": ["city"]}),
            ),
            ToolDescriptor::new("weather/alerts", "active severe weather alerts", json!({"type": "object"})),
        ])),
    ))
    .await;
    gate.register_toolset(ToolsetRegistration::new(
        "calendar",
        manifest("calendar", &["calendar/list_events"]),
        Arc::new(StaticLoader::new([ToolDescriptor::new(
            "calendar/list_events",
            "list upcoming calendar events",
            json!({"type": "object"}),
        )])),
    ))
    .await;

    let gating = Arc::new(GatingService::new(repository.clone(), events.clone()));
    let clients = Arc::new(ClientManager::new(events.clone()));
    let load_balancer = Arc::new(LoadBalancer::new(LoadBalancerConfig::default()));
    let proxy = Arc::new(ProxyService::new(repository.clone(), clients, load_balancer, events.clone()));
    let sessions = Arc::new(SessionManager::new(10, Duration::from_secs(3600)));

    let router = Arc::new(McpRouter::new(repository, gate, gating, proxy, sessions, events));
    router.into_single_session_handler(TransportKind::Http).await
}

async fn send(handler: &RequestHandler, request: JsonRpcRequest) -> JsonRpcResponse {
    handler(request).await.expect("expected a response for a non-notification request")
}

async fn initialize(handler: &RequestHandler) {
    let resp = send(handler, JsonRpcRequest::with_id("initialize", Some(json!({})), json!(0))).await;
    assert!(resp.error.is_none(), "initialize failed: {:?}", resp.error);
}

fn tool_call(name: &str, arguments: serde_json::Value, id: i64) -> JsonRpcRequest {
    JsonRpcRequest::with_id("tools/call", Some(json!({"name": name, "arguments": arguments})), json!(id))
}

#[tokio::test]
async fn uninitialized_session_is_rejected_before_handshake() {
    let handler = build_handler(GateConfig::default()).await;
    let resp = send(&handler, JsonRpcRequest::with_id("tools/list", None, json!(1))).await;
    assert_eq!(resp.error.unwrap().code, error_codes::NOT_INITIALIZED);
}

#[tokio::test]
async fn tools_list_combines_builtins_with_active_toolsets() {
    let handler = build_handler(GateConfig::default()).await;
    initialize(&handler).await;

    let resp = send(&handler, JsonRpcRequest::with_id("tools/list", None, json!(1))).await;
    let tools = resp.result.unwrap();
    let names: Vec<&str> = tools.as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();

    // Built-in tools are always visible.
    assert!(names.contains(&"gate/discover_toolsets"));
    assert!(names.contains(&"discover_tools"));
    // Neither toolset has been enabled yet, so their tools are absent.
    assert!(!names.contains(&"weather/forecast"));
}

#[tokio::test]
async fn discover_then_enable_then_call_round_trip() {
    let handler = build_handler(GateConfig::default()).await;
    initialize(&handler).await;

    let discover = send(&handler, tool_call("discover_tools", json!({"query": "weather forecast"}), 1)).await;
    assert!(discover.error.is_none());
    let found = discover.result.unwrap();
    let names: Vec<&str> = found.as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"weather/forecast"));

    let enable = send(&handler, tool_call("gate/enable_toolset", json!({"name": "weather"}), 2)).await;
    assert!(enable.error.is_none(), "enable failed: {:?}", enable.error);
    let enabled_tools = enable.result.unwrap()["tools"].as_array().unwrap().len();
    assert_eq!(enabled_tools, 2);

    let list_active = send(&handler, tool_call("gate/list_active_tools", json!({}), 3)).await;
    let active: Vec<&str> =
        list_active.result.unwrap()["tools"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert!(active.contains(&"weather/forecast"));

    // Calling the now-active tool fails validation (missing required "city"),
    // proving the call actually reached input validation past auto-enable.
    let call_resp = send(&handler, tool_call("weather/forecast", json!({}), 4)).await;
    assert!(call_resp.error.is_some());
}

#[tokio::test]
async fn calling_an_unenabled_toolsets_tool_auto_enables_it() {
    let handler = build_handler(GateConfig::default()).await;
    initialize(&handler).await;

    let resp = send(&handler, tool_call("calendar/list_events", json!({}), 1)).await;
    // calendar/list_events has no backend registered, so dispatch itself
    // fails, but auto-enable must have run first: the error is a backend/
    // not-found dispatch failure, never the gate's "tool not found".
    assert!(resp.error.is_some());

    let list_active = send(&handler, tool_call("gate/list_active_tools", json!({}), 2)).await;
    let active: Vec<&str> =
        list_active.result.unwrap()["tools"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert!(active.contains(&"calendar/list_events"));
}

#[tokio::test]
async fn pinning_a_toolset_is_reflected_in_list_pinned() {
    let cfg = GateConfig { ttl_millis: 20, ..GateConfig::default() };
    let handler = build_handler(cfg).await;
    initialize(&handler).await;

    send(&handler, tool_call("gate/enable_toolset", json!({"name": "weather"}), 1)).await;
    send(&handler, tool_call("gate/pin_toolset", json!({"name": "weather"}), 2)).await;

    let pinned = send(&handler, tool_call("gate/list_pinned", json!({}), 3)).await;
    let ids: Vec<&str> =
        pinned.result.unwrap()["toolsets"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert!(ids.contains(&"weather"));
}

#[tokio::test]
async fn usage_stats_reports_enabled_toolset() {
    let handler = build_handler(GateConfig::default()).await;
    initialize(&handler).await;

    send(&handler, tool_call("gate/enable_toolset", json!({"name": "calendar"}), 1)).await;
    let stats = send(&handler, tool_call("gate/usage_stats", json!({}), 2)).await;
    let entries = stats.result.unwrap();
    let calendar_entry = entries.as_array().unwrap().iter().find(|e| e["id"] == "calendar");
    assert!(calendar_entry.is_some());
    assert_eq!(calendar_entry.unwrap()["pinned"], json!(false));
}

#[tokio::test]
async fn tools_schema_builtin_returns_a_registered_tools_schema() {
    let handler = build_handler(GateConfig::default()).await;
    initialize(&handler).await;

    send(&handler, tool_call("gate/enable_toolset", json!({"name": "weather"}), 1)).await;
    let schema = send(&handler, tool_call("tools/schema", json!({"name": "weather/forecast"}), 2)).await;
    assert!(schema.error.is_none());
    assert_eq!(schema.result.unwrap()["name"], json!("weather/forecast"));

    let missing = send(&handler, tool_call("tools/schema", json!({"name": "nonexistent/tool"}), 3)).await;
    assert!(missing.error.is_some());
}

#[tokio::test]
async fn unknown_top_level_method_is_rejected() {
    let handler = build_handler(GateConfig::default()).await;
    initialize(&handler).await;
    let resp = send(&handler, JsonRpcRequest::with_id("bogus/method", None, json!(1))).await;
    assert_eq!(resp.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn notifications_produce_no_response() {
    let handler = build_handler(GateConfig::default()).await;
    initialize(&handler).await;
    let resp = handler(JsonRpcRequest::notification("tools/list", None)).await;
    assert!(resp.is_none());
}
