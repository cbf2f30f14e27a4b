// ABOUTME: Small set of cross-cutting constants used by logging, config defaults, and the CLI
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Default `serverInfo.name` advertised in the `initialize` response.
pub const SERVER_NAME: &str = "toolgate";

/// Broadcast channel capacity for the event bus when not otherwise configured.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;

/// Default interval, in seconds, between TTL sweep / LRU enforcement passes.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
