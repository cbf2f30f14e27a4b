// ABOUTME: Ordered, side-effect-free filter chain applied to the active tool set
// ABOUTME: TaskType -> Resource -> Security, each a pure Map<Name,Tool> -> Map<Name,Tool>
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::descriptor::ToolDescriptor;

/// Per-request context consulted by the filter chain.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    /// Current task type, if any, used by the `TaskType` filter.
    pub task_type: Option<String>,
}

/// Configuration for the `TaskType` filter: `taskType -> [allowed tool names]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskTypeFilterConfig {
    /// Whether this filter is active.
    pub enabled: bool,
    /// Per-task-type allow lists.
    #[serde(default)]
    pub map: HashMap<String, Vec<String>>,
}

/// Configuration for the `Resource` filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceFilterConfig {
    /// Whether this filter is active.
    pub enabled: bool,
    /// Maximum number of tools to keep. Absent means unbounded; `<= 0` means
    /// "drop all".
    #[serde(rename = "maxTools", default, skip_serializing_if = "Option::is_none")]
    pub max_tools: Option<i64>,
}

/// Configuration for the `Security` filter: a blocklist of tool names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityFilterConfig {
    /// Whether this filter is active.
    pub enabled: bool,
    /// Tool names that must never be visible.
    #[serde(default)]
    pub blocked: Vec<String>,
}

/// Ordered map preserving the iteration order tools were inserted in, since
/// the filter chain's contract is defined in terms of "input iteration
/// order".
pub type ToolMap = IndexMap<String, ToolDescriptor>;

/// Apply the `TaskType` filter, first in the chain.
///
/// Missing `context.task_type`, or no map entry for it, passes input through
/// unchanged. Otherwise the output is the intersection of `tools` and the
/// configured allow list, preserving `tools`' iteration order.
#[must_use]
pub fn apply_task_type(tools: &ToolMap, ctx: &FilterContext, cfg: &TaskTypeFilterConfig) -> ToolMap {
    if !cfg.enabled {
        return tools.clone();
    }
    let Some(task_type) = ctx.task_type.as_deref() else {
        return tools.clone();
    };
    let Some(allowed) = cfg.map.get(task_type) else {
        return tools.clone();
    };

    tools
        .iter()
        .filter(|(name, _)| allowed.iter().any(|a| a == *name))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Apply the `Resource` filter, second in the chain.
///
/// `max_tools` absent => no limit. `max_tools <= 0` => drop all. Otherwise
/// truncate to the first `max_tools` entries in iteration order.
#[must_use]
pub fn apply_resource(tools: &ToolMap, cfg: &ResourceFilterConfig) -> ToolMap {
    if !cfg.enabled {
        return tools.clone();
    }
    match cfg.max_tools {
        None => tools.clone(),
        Some(limit) if limit <= 0 => ToolMap::new(),
        Some(limit) => tools
            .iter()
            .take(limit as usize)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

/// Apply the `Security` filter, last in the chain.
///
/// Removes any tool whose name appears in `blocked`.
#[must_use]
pub fn apply_security(tools: &ToolMap, cfg: &SecurityFilterConfig) -> ToolMap {
    if !cfg.enabled {
        return tools.clone();
    }
    tools
        .iter()
        .filter(|(name, _)| !cfg.blocked.iter().any(|b| b == *name))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Full chain configuration, matching the `TOOL_FILTER_CONFIG` shape
/// for the three filter sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterChainConfig {
    /// `TaskType` filter configuration.
    #[serde(rename = "taskType", default)]
    pub task_type: TaskTypeFilterConfig,
    /// `Resource` filter configuration.
    #[serde(default)]
    pub resource: ResourceFilterConfig,
    /// `Security` filter configuration.
    #[serde(default)]
    pub security: SecurityFilterConfig,
}

/// Run the fixed-order filter chain: `TaskType` -> `Resource` -> `Security`.
///
/// Pure: never mutates `tools`. Idempotent on fixed input (invariant 6).
#[must_use]
pub fn run_chain(tools: &ToolMap, ctx: &FilterContext, cfg: &FilterChainConfig) -> ToolMap {
    let after_task_type = apply_task_type(tools, ctx, &cfg.task_type);
    let after_resource = apply_resource(&after_task_type, &cfg.resource);
    apply_security(&after_resource, &cfg.security)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(names: &[&str]) -> ToolMap {
        names
            .iter()
            .map(|n| ((*n).to_owned(), ToolDescriptor::new(*n, "d", json!({}))))
            .collect()
    }

    #[test]
    fn task_type_passthrough_when_missing_context() {
        let tools = map(&["a", "b"]);
        let cfg = TaskTypeFilterConfig {
            enabled: true,
            map: HashMap::from([("t".to_owned(), vec!["a".to_owned()])]),
        };
        let ctx = FilterContext::default();
        let out = apply_task_type(&tools, &ctx, &cfg);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn task_type_intersects_preserving_order() {
        let tools = map(&["a", "b", "c"]);
        let cfg = TaskTypeFilterConfig {
            enabled: true,
            map: HashMap::from([("t".to_owned(), vec!["c".to_owned(), "a".to_owned()])]),
        };
        let ctx = FilterContext { task_type: Some("t".into()) };
        let out = apply_task_type(&tools, &ctx, &cfg);
        let names: Vec<_> = out.keys().cloned().collect();
        assert_eq!(names, vec!["a".to_owned(), "c".to_owned()]);
    }

    #[test]
    fn resource_max_tools_absent_is_unbounded() {
        let tools = map(&["a", "b"]);
        let cfg = ResourceFilterConfig { enabled: true, max_tools: None };
        assert_eq!(apply_resource(&tools, &cfg).len(), 2);
    }

    #[test]
    fn resource_max_tools_zero_drops_all() {
        let tools = map(&["a", "b"]);
        let cfg = ResourceFilterConfig { enabled: true, max_tools: Some(0) };
        assert!(apply_resource(&tools, &cfg).is_empty());
    }

    #[test]
    fn resource_negative_drops_all() {
        let tools = map(&["a"]);
        let cfg = ResourceFilterConfig { enabled: true, max_tools: Some(-5) };
        assert!(apply_resource(&tools, &cfg).is_empty());
    }

    #[test]
    fn security_removes_blocked() {
        let tools = map(&["a", "b"]);
        let cfg = SecurityFilterConfig { enabled: true, blocked: vec!["b".into()] };
        let out = apply_security(&tools, &cfg);
        assert_eq!(out.keys().cloned().collect::<Vec<_>>(), vec!["a".to_owned()]);
    }

    #[test]
    fn chain_is_idempotent() {
        let tools = map(&["a", "b", "c"]);
        let cfg = FilterChainConfig {
            task_type: TaskTypeFilterConfig::default(),
            resource: ResourceFilterConfig { enabled: true, max_tools: Some(2) },
            security: SecurityFilterConfig { enabled: true, blocked: vec!["a".into()] },
        };
        let ctx = FilterContext::default();
        let once = run_chain(&tools, &ctx, &cfg);
        let twice = run_chain(&once, &ctx, &cfg);
        assert_eq!(once.keys().collect::<Vec<_>>(), twice.keys().collect::<Vec<_>>());
    }
}
