// ABOUTME: Proxy / Client Manager: backend lifecycle, routing, input validation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod client_manager;
pub mod service;
pub mod validation;

pub use client_manager::{BackendConfig, BackendTransport, ClientManager};
pub use service::ProxyService;
pub use validation::validate_input;
