// ABOUTME: CLI entry point: wires config, logging, the gate/proxy stack, and the selected transports
// ABOUTME: Always runs the periodic sweep task; stdio/http/websocket transports are started per flags
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info};

use toolgate::config::{ServerConfig, ToolFilterFile};
use toolgate::discovery::GatingService;
use toolgate::events::EventBus;
use toolgate::gate::ToolGateController;
use toolgate::loadbalancer::LoadBalancer;
use toolgate::logging::LoggingConfig;
use toolgate::proxy::{ClientManager, ProxyService};
use toolgate::server::McpRouter;
use toolgate::session::{SessionManager, TransportKind};
use toolgate::tools::ToolRepository;
use toolgate::transport::http::HttpTransport;
use toolgate::transport::stdio::StdioTransport;
use toolgate::transport::websocket::WebSocketTransport;
use toolgate::transport::Transport;

/// Tool-gating MCP proxy server.
#[derive(Debug, Parser)]
#[command(name = "toolgate-server", about = "Tool-gating MCP proxy server")]
struct Cli {
    /// Path to a `TOOL_FILTER_CONFIG`-shaped JSON file. Overrides the
    /// `TOOL_FILTER_CONFIG` environment variable if given.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Serve the stdio transport.
    #[arg(long)]
    stdio: bool,

    /// Serve the HTTP transport on this port (0 disables it).
    #[arg(long)]
    http_port: Option<u16>,

    /// Serve the WebSocket transport on this port (0 disables it).
    #[arg(long)]
    ws_port: Option<u16>,

    /// Override `LOG_FORMAT` (`pretty`, `json`, `compact`).
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(format) = &cli.log_format {
        std::env::set_var("LOG_FORMAT", format);
    }
    LoggingConfig::from_env().init().ok();

    let mut server_config = ServerConfig::from_env();
    if let Some(port) = cli.http_port {
        server_config.http_port = port;
    }
    if let Some(port) = cli.ws_port {
        server_config.ws_port = port;
    }

    let filter_file = match &cli.config {
        Some(path) => ToolFilterFile::load_from(path)?,
        None => ToolFilterFile::load()?,
    };
    server_config.gate = filter_file.gate_config();

    info!(?server_config.http_port, ?server_config.ws_port, "starting toolgate-server");

    let events = EventBus::new(toolgate::constants::DEFAULT_EVENT_BUS_CAPACITY);
    let repository = Arc::new(AsyncMutex::new(ToolRepository::new()));
    let gate = Arc::new(ToolGateController::new(server_config.gate.clone(), filter_file.filters.clone(), events.clone()));
    let gating = Arc::new(GatingService::new(repository.clone(), events.clone()));
    let clients = Arc::new(ClientManager::new(events.clone()));
    let load_balancer = Arc::new(LoadBalancer::new(server_config.load_balancer.clone()));
    let proxy = Arc::new(ProxyService::new(repository.clone(), clients, load_balancer, events.clone()));
    let sessions = Arc::new(SessionManager::new(server_config.max_sessions, server_config.session_idle_timeout));

    let router = Arc::new(McpRouter::new(repository, gate.clone(), gating, proxy, sessions.clone(), events));
    router.clone().spawn_notification_bridge();

    let sweep_task = toolgate::server::sweep::spawn(gate, sessions, server_config.sweep_interval);

    let mut transports: Vec<Arc<dyn Transport>> = Vec::new();

    if server_config.http_port != 0 {
        let handler = router.clone().into_single_session_handler(TransportKind::Http).await;
        let addr: SocketAddr = ([0, 0, 0, 0], server_config.http_port).into();
        transports.push(Arc::new(HttpTransport::new(addr, handler)));
    }

    if server_config.ws_port != 0 {
        let factory = router.clone().handler_factory(TransportKind::WebSocket);
        let addr: SocketAddr = ([0, 0, 0, 0], server_config.ws_port).into();
        let ws = Arc::new(WebSocketTransport::new(addr, factory));
        router.register_notification_sink(ws.clone()).await;
        transports.push(ws);
    }

    for transport in &transports {
        transport.start().await?;
    }

    if cli.stdio {
        let handler = router.clone().into_single_session_handler(TransportKind::Stdio).await;
        let stdio = Arc::new(StdioTransport::new(handler));
        router.register_notification_sink(stdio.clone()).await;
        stdio.start().await?;
    } else {
        tokio::signal::ctrl_c().await?;
    }

    for transport in &transports {
        if let Err(err) = transport.stop().await {
            error!(error = %err, "error stopping transport");
        }
    }
    sweep_task.abort();
    Ok(())
}
