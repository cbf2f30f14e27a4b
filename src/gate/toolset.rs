// ABOUTME: Toolset type: a named, lazily-loaded group of tool descriptors
// ABOUTME: Manifests are a cheap sidecar used to build the reverse index without loading the code
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::GateResult;
use crate::tools::ToolDescriptor;

/// Lifecycle state of a [`ToolsetRegistration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolsetState {
    /// Registered but never loaded.
    Unloaded,
    /// A loader is currently running.
    Loading,
    /// Successfully loaded and its descriptors are in the active map.
    Active,
    /// Was active, then explicitly disabled or evicted.
    Disabled,
}

/// Cheap sidecar listing the tool names a toolset *would* produce, without
/// paying the cost of running its loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsetManifest {
    /// Toolset id this manifest describes.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Tool names this toolset would produce.
    pub tools: Vec<String>,
}

/// Produces a toolset's descriptors on demand. Implementations may spawn a
/// backend, read a bundled schema file, or synthesize tools in-process.
#[async_trait]
pub trait ToolsetLoader: Send + Sync {
    /// Load every tool this toolset provides.
    ///
    /// # Errors
    /// Returns an error if the underlying source (backend, file, ...) fails.
    async fn load(&self) -> GateResult<HashMap<String, ToolDescriptor>>;
}

/// A loader backed by a fixed, in-memory set of descriptors. Useful for
/// tests and for toolsets that do not need I/O to produce their tools.
pub struct StaticLoader {
    tools: HashMap<String, ToolDescriptor>,
}

impl StaticLoader {
    /// Build a loader that always returns the given tools.
    #[must_use]
    pub fn new(tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }
}

#[async_trait]
impl ToolsetLoader for StaticLoader {
    async fn load(&self) -> GateResult<HashMap<String, ToolDescriptor>> {
        Ok(self.tools.clone())
    }
}

/// A registered toolset: its id, optional manifest, and loader.
#[derive(Clone)]
pub struct ToolsetRegistration {
    /// Unique toolset id.
    pub id: String,
    /// Optional manifest used to build the reverse index cheaply.
    pub manifest: Option<ToolsetManifest>,
    /// Loader invoked on `enable_toolset`.
    pub loader: Arc<dyn ToolsetLoader>,
}

impl ToolsetRegistration {
    /// Register a toolset with an explicit manifest.
    #[must_use]
    pub fn new(id: impl Into<String>, manifest: ToolsetManifest, loader: Arc<dyn ToolsetLoader>) -> Self {
        Self {
            id: id.into(),
            manifest: Some(manifest),
            loader,
        }
    }

    /// Register a toolset with no manifest (reverse-index lookups for its
    /// tools only succeed once it has been loaded at least once).
    #[must_use]
    pub fn without_manifest(id: impl Into<String>, loader: Arc<dyn ToolsetLoader>) -> Self {
        Self {
            id: id.into(),
            manifest: None,
            loader,
        }
    }
}

/// Per-active-toolset usage bookkeeping.
///
/// The pin flag itself is tracked separately by the controller's pin set,
/// since "pinning a not-yet-enabled toolset is allowed" —
/// pin state must survive toolsets that aren't in the usage table at all.
#[derive(Debug, Clone, Copy)]
pub struct UsageEntry {
    /// Milliseconds since the Unix epoch of last activation or successful call.
    pub last_used_at_millis: i64,
}
