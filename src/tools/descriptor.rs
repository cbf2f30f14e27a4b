// ABOUTME: Tool descriptor type shared by the repository, gate controller, and discovery engine
// ABOUTME: Globally unique by name; "/" conventionally separates a category prefix
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single callable tool exposed (directly or via a toolset) to clients.
///
/// `name` is globally unique. By convention it uses `/` as a namespace
/// separator whose prefix is the tool's primary category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Globally unique tool name, e.g. `"fs/read_file"`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON-Schema object describing the tool's input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Categories this tool belongs to (first is conventionally the name prefix).
    #[serde(default)]
    pub categories: Vec<String>,
    /// Free-form capability tags used by the Filter Chain and discovery.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Whether this tool is deprecated (excluded from search unless requested).
    #[serde(default)]
    pub deprecated: bool,
    /// Caller-supplied token estimate. Never trusted directly by provisioning
    /// math unless non-negative; missing is treated as "estimate from JSON
    /// length".
    #[serde(rename = "tokenCount", default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
    /// Name of the backend that owns this tool, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    /// Which toolset or discovery pass produced this descriptor.
    #[serde(rename = "discoverySource", default, skip_serializing_if = "Option::is_none")]
    pub discovery_source: Option<String>,
}

impl ToolDescriptor {
    /// Construct a minimal descriptor; all optional fields default.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            categories: Vec::new(),
            capabilities: Vec::new(),
            deprecated: false,
            token_count: None,
            backend: None,
            discovery_source: None,
        }
    }

    /// Attach categories (builder-style).
    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Attach capabilities (builder-style).
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Attach an owning backend (builder-style).
    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Estimated token cost of this descriptor.
    ///
    /// A caller-supplied, non-negative `token_count` is honored; otherwise
    /// the estimate is derived from the JSON-encoded length of the
    /// descriptor: `max(1, ceil(len(json) / 4))`.
    #[must_use]
    pub fn estimated_tokens(&self) -> u32 {
        if let Some(count) = self.token_count {
            return count;
        }
        let encoded = serde_json::to_string(self).unwrap_or_default();
        let len = encoded.chars().count();
        let estimate = len.div_ceil(4);
        estimate.max(1) as u32
    }

    /// Primary category, derived from the `/`-separated name prefix if no
    /// explicit categories were set.
    #[must_use]
    pub fn category_prefix(&self) -> Option<&str> {
        self.name.split('/').next().filter(|s| !s.is_empty())
    }
}
