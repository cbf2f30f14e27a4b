// ABOUTME: toolgate -- a tool-gating MCP proxy: dynamic toolset activation, discovery, and routing
// ABOUTME: Crate root wiring every module; see DESIGN.md for how each part is grounded
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod config;
pub mod constants;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod gate;
pub mod jsonrpc;
pub mod loadbalancer;
pub mod logging;
pub mod proxy;
pub mod schema;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;
