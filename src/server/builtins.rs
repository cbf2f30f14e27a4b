// ABOUTME: Names, schemas, and dispatch keys for every built-in (non-backend) tool
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde_json::{json, Value};

use crate::errors::GateError;

/// A built-in tool the router answers itself, without dispatching to any
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    /// Server name/version.
    SystemInfo,
    /// Liveness check.
    SystemHealth,
    /// Every currently callable tool (built-ins plus active toolset tools).
    ToolsList,
    /// Full schema for one named tool.
    ToolsSchema,
    /// Keyword-ranked search over every known tool.
    DiscoverTools,
    /// Discover, then greedily fit within a token budget.
    ProvisionTools,
    /// Every registered toolset id.
    GateDiscoverToolsets,
    /// Activate a toolset's tools.
    GateEnableToolset,
    /// Deactivate a toolset's tools.
    GateDisableToolset,
    /// Names of every currently active tool.
    GateListActiveTools,
    /// Exempt a toolset from TTL/LRU eviction.
    GatePinToolset,
    /// Remove a toolset's pin.
    GateUnpinToolset,
    /// Every currently pinned toolset.
    GateListPinned,
    /// Last-used timestamp and pin state per active toolset.
    GateUsageStats,
}

impl BuiltinTool {
    /// Map a wire tool name to its built-in variant, if any.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "system/info" => Self::SystemInfo,
            "system/health" => Self::SystemHealth,
            "tools/list" => Self::ToolsList,
            "tools/schema" => Self::ToolsSchema,
            "discover_tools" => Self::DiscoverTools,
            "provision_tools" => Self::ProvisionTools,
            "gate/discover_toolsets" => Self::GateDiscoverToolsets,
            "gate/enable_toolset" => Self::GateEnableToolset,
            "gate/disable_toolset" => Self::GateDisableToolset,
            "gate/list_active_tools" => Self::GateListActiveTools,
            "gate/pin_toolset" => Self::GatePinToolset,
            "gate/unpin_toolset" => Self::GateUnpinToolset,
            "gate/list_pinned" => Self::GateListPinned,
            "gate/usage_stats" => Self::GateUsageStats,
            _ => return None,
        })
    }

    /// Wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SystemInfo => "system/info",
            Self::SystemHealth => "system/health",
            Self::ToolsList => "tools/list",
            Self::ToolsSchema => "tools/schema",
            Self::DiscoverTools => "discover_tools",
            Self::ProvisionTools => "provision_tools",
            Self::GateDiscoverToolsets => "gate/discover_toolsets",
            Self::GateEnableToolset => "gate/enable_toolset",
            Self::GateDisableToolset => "gate/disable_toolset",
            Self::GateListActiveTools => "gate/list_active_tools",
            Self::GatePinToolset => "gate/pin_toolset",
            Self::GateUnpinToolset => "gate/unpin_toolset",
            Self::GateListPinned => "gate/list_pinned",
            Self::GateUsageStats => "gate/usage_stats",
        }
    }

    /// One-line description surfaced in `tools/list`.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SystemInfo => "Report server name and version",
            Self::SystemHealth => "Liveness check",
            Self::ToolsList => "List every currently callable tool",
            Self::ToolsSchema => "Fetch the full input schema for a tool",
            Self::DiscoverTools => "Keyword-search across every known tool",
            Self::ProvisionTools => "Discover tools and fit them within a token budget",
            Self::GateDiscoverToolsets => "List every registered toolset id",
            Self::GateEnableToolset => "Activate a toolset's tools",
            Self::GateDisableToolset => "Deactivate a toolset's tools",
            Self::GateListActiveTools => "List every currently active tool name",
            Self::GatePinToolset => "Exempt a toolset from TTL and LRU eviction",
            Self::GateUnpinToolset => "Remove a toolset's eviction exemption",
            Self::GateListPinned => "List every currently pinned toolset",
            Self::GateUsageStats => "Report last-used time and pin state per active toolset",
        }
    }

    /// JSON Schema for this tool's arguments.
    #[must_use]
    pub fn input_schema(self) -> Value {
        match self {
            Self::SystemInfo | Self::SystemHealth | Self::ToolsList | Self::GateDiscoverToolsets
            | Self::GateListActiveTools | Self::GateListPinned | Self::GateUsageStats => {
                json!({ "type": "object", "properties": {} })
            }
            Self::ToolsSchema => json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"],
            }),
            Self::DiscoverTools => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer" },
                },
                "required": ["query"],
            }),
            Self::ProvisionTools => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "maxTokens": { "type": "number" },
                },
                "required": ["query", "maxTokens"],
            }),
            Self::GateEnableToolset | Self::GateDisableToolset | Self::GatePinToolset | Self::GateUnpinToolset => {
                json!({
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["name"],
                })
            }
        }
    }
}

/// A plain descriptor used only to render `tools/list` entries; built-ins are
/// never stored in the [`crate::tools::ToolRepository`].
pub struct BuiltinDescriptor {
    /// Wire name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Input JSON Schema.
    pub input_schema: Value,
}

/// Every built-in tool, in dispatch-table order.
#[must_use]
pub fn builtin_descriptors() -> Vec<BuiltinDescriptor> {
    [
        BuiltinTool::SystemInfo,
        BuiltinTool::SystemHealth,
        BuiltinTool::ToolsList,
        BuiltinTool::ToolsSchema,
        BuiltinTool::DiscoverTools,
        BuiltinTool::ProvisionTools,
        BuiltinTool::GateDiscoverToolsets,
        BuiltinTool::GateEnableToolset,
        BuiltinTool::GateDisableToolset,
        BuiltinTool::GateListActiveTools,
        BuiltinTool::GatePinToolset,
        BuiltinTool::GateUnpinToolset,
        BuiltinTool::GateListPinned,
        BuiltinTool::GateUsageStats,
    ]
    .into_iter()
    .map(|t| BuiltinDescriptor { name: t.name(), description: t.description(), input_schema: t.input_schema() })
    .collect()
}

/// Extract the `name` argument common to most `gate/*` built-ins.
///
/// # Errors
/// [`GateError::InvalidInput`] if `name` is missing or not a string.
pub fn require_name(args: &Value) -> Result<String, GateError> {
    args.get("name")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| GateError::InvalidInput("missing name".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_round_trips_through_from_name() {
        for descriptor in builtin_descriptors() {
            let tool = BuiltinTool::from_name(descriptor.name).unwrap();
            assert_eq!(tool.name(), descriptor.name);
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(BuiltinTool::from_name("not/a/tool").is_none());
    }

    #[test]
    fn require_name_rejects_missing() {
        assert!(require_name(&json!({})).is_err());
    }
}
