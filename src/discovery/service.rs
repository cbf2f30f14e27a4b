// ABOUTME: Combines discover+provision over a shared tool repository and emits a metrics event
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::events::{Event, EventBus};
use crate::tools::ToolRepository;

use super::{discover, provision};

/// Emitted on every `GatingService::provision` call.
#[derive(Debug, Clone, Default)]
pub struct GatingMetrics {
    /// Number of tools the discovery pass matched.
    pub tools_discovered: usize,
    /// Number of tools the provisioning pass actually selected.
    pub tools_provisioned: usize,
    /// The token budget requested.
    pub tokens_budgeted: f64,
    /// Sum of estimated tokens across the provisioned tools.
    pub tokens_used: u64,
}

/// Wraps a shared [`ToolRepository`] with discover + provision, publishing a
/// [`GatingMetrics`] event after every provisioning pass.
pub struct GatingService {
    repository: Arc<Mutex<ToolRepository>>,
    events: EventBus,
}

impl GatingService {
    /// Construct a gating service over a shared repository.
    #[must_use]
    pub fn new(repository: Arc<Mutex<ToolRepository>>, events: EventBus) -> Self {
        Self { repository, events }
    }

    /// Rank every known tool against `query`, keeping at most `limit`.
    pub async fn discover(&self, query: &str, limit: i64) -> Vec<super::DiscoveredTool> {
        let repo = self.repository.lock().await;
        let tools: Vec<_> = repo.all().cloned().collect();
        drop(repo);
        discover(&tools, query, limit)
    }

    /// `provision(discover(query, limit=unbounded), max_tokens)`, emitting a
    /// [`GatingMetrics`] event on the bus.
    pub async fn provision(&self, query: &str, max_tokens: f64) -> Vec<crate::tools::ToolDescriptor> {
        let discovered = self.discover(query, i64::MAX).await;
        let tools: Vec<_> = discovered.into_iter().map(|d| d.tool).collect();
        let selected = provision(&tools, max_tokens);

        let tokens_used = selected.iter().map(|t| u64::from(t.estimated_tokens())).sum();
        let metrics = GatingMetrics {
            tools_discovered: tools.len(),
            tools_provisioned: selected.len(),
            tokens_budgeted: max_tokens,
            tokens_used,
        };
        self.events.publish(Event::GatingMetrics(metrics));

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_with_tokens(name: &str, tokens: u32) -> crate::tools::ToolDescriptor {
        let mut t = crate::tools::ToolDescriptor::new(name, "operations tool", json!({}));
        t.token_count = Some(tokens);
        t
    }

    #[tokio::test]
    async fn provision_emits_metrics_event() {
        let mut repo = ToolRepository::new();
        repo.add_tool(tool_with_tokens("tool-a", 300)).unwrap();
        repo.add_tool(tool_with_tokens("tool-b", 400)).unwrap();
        repo.add_tool(tool_with_tokens("tool-c", 500)).unwrap();

        let events = EventBus::default();
        let mut rx = events.subscribe();
        let service = GatingService::new(Arc::new(Mutex::new(repo)), events);

        let result = service.provision("operations", 700.0).await;
        assert_eq!(result.len(), 2);

        let event = rx.recv().await.unwrap();
        match event {
            Event::GatingMetrics(metrics) => {
                assert_eq!(metrics.tools_discovered, 3);
                assert_eq!(metrics.tools_provisioned, 2);
                assert_eq!(metrics.tokens_used, 700);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
