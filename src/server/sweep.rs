// ABOUTME: Background task that periodically runs TTL expiry, LRU eviction, and idle-session sweep
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::gate::ToolGateController;
use crate::session::SessionManager;

/// Spawn the periodic maintenance loop: TTL-expire unpinned active toolsets,
/// enforce the LRU active-toolset cap, and evict idle sessions, once per
/// `interval`.
pub fn spawn(gate: Arc<ToolGateController>, sessions: Arc<SessionManager>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let expired = gate.sweep_expired().await;
            if !expired.is_empty() {
                info!(count = expired.len(), "ttl-expired toolsets disabled");
            }

            let evicted = gate.enforce_lru_cap().await;
            if !evicted.is_empty() {
                info!(count = evicted.len(), "lru-evicted toolsets disabled");
            }

            let idle = sessions.sweep_idle().await;
            if !idle.is_empty() {
                debug!(count = idle.len(), "idle sessions evicted");
            }
        }
    })
}
