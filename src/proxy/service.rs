// ABOUTME: Validates tool input, dispatches to the Client Manager, and emits execute events
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::errors::{GateError, GateResult};
use crate::events::{Event, EventBus};
use crate::loadbalancer::LoadBalancer;
use crate::tools::ToolRepository;

use super::client_manager::ClientManager;
use super::validation::validate_input;

/// Validates input against a tool's schema, admits the call through the
/// Load Balancer, dispatches it to its owning backend, and emits a
/// success/failure event.
pub struct ProxyService {
    repository: Arc<Mutex<ToolRepository>>,
    clients: Arc<ClientManager>,
    load_balancer: Arc<LoadBalancer>,
    events: EventBus,
}

impl ProxyService {
    /// Construct a proxy service over a shared repository, client manager,
    /// and load balancer.
    #[must_use]
    pub fn new(
        repository: Arc<Mutex<ToolRepository>>,
        clients: Arc<ClientManager>,
        load_balancer: Arc<LoadBalancer>,
        events: EventBus,
    ) -> Self {
        Self { repository, clients, load_balancer, events }
    }

    /// Validate and execute a call to `tool_name`.
    ///
    /// # Errors
    /// [`GateError::NotFound`] if the tool is unknown or has no backend;
    /// validation errors from [`validate_input`]; [`GateError::FlowControl`]
    /// if the Load Balancer denies admission; a [`GateError::Backend`] on
    /// backend failure, re-wrapped with the `[ProxyService] server=...
    /// tool=...` prefix baked into its `Display` impl.
    pub async fn call_tool(&self, tool_name: &str, input: Value) -> GateResult<Value> {
        let tool = {
            let repo = self.repository.lock().await;
            repo.get(tool_name).cloned()
        };
        let Some(tool) = tool else {
            return Err(GateError::not_found("tool", tool_name));
        };
        let Some(backend) = tool.backend.clone() else {
            return Err(GateError::not_found("tool", tool_name));
        };

        if let Err(err) = validate_input(&tool.input_schema, &input) {
            return Err(err);
        }

        let permit = self.load_balancer.admit(&backend, tool_name).await?;

        let outcome = self.clients.execute_tool(&backend, tool_name, input).await;
        self.load_balancer.record_outcome(&backend, tool_name, outcome.is_ok());
        drop(permit);

        match outcome {
            Ok(result) => {
                self.events.publish(Event::ToolExecuteOk { server: backend, tool: tool_name.to_owned() });
                Ok(result)
            }
            Err(err) => {
                warn!(server = backend, tool = tool_name, error = %err, "tool execution failed");
                self.events.publish(Event::ToolExecuteErr {
                    server: backend.clone(),
                    tool: tool_name.to_owned(),
                    message: err.sanitized_message(),
                });
                Err(GateError::backend(backend, tool_name, err.sanitized_message()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadbalancer::LoadBalancerConfig;
    use serde_json::json;

    fn load_balancer() -> Arc<LoadBalancer> {
        Arc::new(LoadBalancer::new(LoadBalancerConfig::default()))
    }

    #[tokio::test]
    async fn call_tool_rejects_unknown_tool() {
        let service = ProxyService::new(
            Arc::new(Mutex::new(ToolRepository::new())),
            Arc::new(ClientManager::new(EventBus::default())),
            load_balancer(),
            EventBus::default(),
        );
        let err = service.call_tool("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, GateError::NotFound { .. }));
    }

    #[tokio::test]
    async fn call_tool_rejects_tool_with_no_backend() {
        let mut repo = ToolRepository::new();
        repo.add_tool(crate::tools::ToolDescriptor::new("t", "d", json!({"type": "object"}))).unwrap();
        let service = ProxyService::new(
            Arc::new(Mutex::new(repo)),
            Arc::new(ClientManager::new(EventBus::default())),
            load_balancer(),
            EventBus::default(),
        );
        let err = service.call_tool("t", json!({})).await.unwrap_err();
        assert!(matches!(err, GateError::NotFound { .. }));
    }

    #[tokio::test]
    async fn call_tool_validates_before_dispatch() {
        let mut repo = ToolRepository::new();
        repo.add_tool(
            crate::tools::ToolDescriptor::new(
                "t",
                "d",
                json!({"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]}),
            )
            .with_backend("b"),
        )
        .unwrap();
        let service = ProxyService::new(
            Arc::new(Mutex::new(repo)),
            Arc::new(ClientManager::new(EventBus::default())),
            load_balancer(),
            EventBus::default(),
        );
        let err = service.call_tool("t", json!({})).await.unwrap_err();
        assert!(matches!(err, GateError::MissingRequired(_)));
    }
}
