// ABOUTME: Typed event bus shared by the proxy, client manager, and gating service
// ABOUTME: Closed event-kind enum broadcast over a tokio channel; no global state
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use tokio::sync::broadcast;
use tracing::trace;

/// Every event kind the proxy can emit.
#[derive(Debug, Clone)]
pub enum Event {
    /// A tool call completed successfully.
    ToolExecuteOk {
        /// Backend the call was routed to.
        server: String,
        /// Tool name that was called.
        tool: String,
    },
    /// A tool call failed.
    ToolExecuteErr {
        /// Backend the call was routed to.
        server: String,
        /// Tool name that was called.
        tool: String,
        /// Sanitized error message.
        message: String,
    },
    /// A toolset was auto-enabled on first call to one of its tools.
    GateAutoEnable {
        /// Toolset id.
        toolset: String,
    },
    /// A toolset was auto-disabled by the TTL sweep.
    GateAutoDisableTtl {
        /// Toolset id.
        toolset: String,
    },
    /// A toolset was auto-disabled by LRU enforcement.
    GateAutoDisableLru {
        /// Toolset id.
        toolset: String,
    },
    /// A backend connection was established.
    BackendConnected {
        /// Backend name.
        name: String,
    },
    /// A backend connection was torn down.
    BackendDisconnected {
        /// Backend name.
        name: String,
    },
    /// A discovery/provisioning pass completed.
    GatingMetrics(crate::discovery::GatingMetrics),
}

/// A single typed publish/subscribe channel, injected as a dependency into
/// every component that needs to emit or observe events rather than reached
/// for as global state.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Construct a bus with the given broadcast channel capacity. Slow
    /// subscribers that fall behind this many events will miss the oldest
    /// ones (a `tokio::sync::broadcast` lagged-receiver, not a panic).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. A no-op (not an error) if nobody is subscribed.
    pub fn publish(&self, event: Event) {
        trace!(?event, "event published");
        let _ = self.sender.send(event);
    }

    /// Subscribe to every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
