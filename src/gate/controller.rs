// ABOUTME: Tool Gate Controller: toolset lifecycle, TTL/LRU eviction, pin/unpin, auto-enable
// ABOUTME: The hardest component -- owns the live active-tool map exclusively
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::mapref::entry::Entry as DashEntry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::errors::{GateError, GateResult};
use crate::events::{Event, EventBus};
use crate::tools::{FilterChainConfig, FilterContext, ToolMap};

use super::reverse_index::ReverseIndex;
use super::toolset::{ToolsetRegistration, UsageEntry};

/// How to pick a single owner when a tool name has multiple potential
/// owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictResolution {
    /// Prefer an owner that is already active; otherwise the first listed.
    PreferEnabled,
    /// Always the first listed owner.
    FirstMatch,
    /// Fail with [`GateError::Ambiguous`] if more than one owner exists.
    Error,
}

impl Default for ConflictResolution {
    fn default() -> Self {
        Self::PreferEnabled
    }
}

/// Static configuration for the Gate Controller.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Milliseconds of inactivity before an unpinned, active toolset is swept.
    pub ttl_millis: i64,
    /// Maximum concurrently active toolsets. `0` means unlimited.
    pub max_active_toolsets: usize,
    /// Whether `ensure_tool_available` may activate a toolset on first call.
    pub auto_enable_on_call: bool,
    /// Whether tool-name matching for auto-enable is case-insensitive.
    pub auto_enable_case_insensitive: bool,
    /// Policy used when a tool name has more than one potential owner.
    pub conflict_resolution: ConflictResolution,
    /// If non-empty, only these patterns (`"p/*"` prefix supported) may auto-enable.
    pub auto_enable_allowlist: Vec<String>,
    /// Patterns that may never auto-enable, checked before the allowlist.
    pub auto_enable_blocklist: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ttl_millis: 300_000,
            max_active_toolsets: 0,
            auto_enable_on_call: true,
            auto_enable_case_insensitive: false,
            conflict_resolution: ConflictResolution::PreferEnabled,
            auto_enable_allowlist: Vec::new(),
            auto_enable_blocklist: Vec::new(),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Matches glob-lite patterns used by the allow/block lists: a trailing `*`
/// is a prefix match, anything else is an exact match.
fn matches_pattern(pattern: &str, name: &str) -> bool {
    pattern.strip_suffix('*').map_or_else(|| name == pattern, |prefix| name.starts_with(prefix))
}

fn matches_any(patterns: &[String], name: &str) -> bool {
    patterns.iter().any(|p| matches_pattern(p, name))
}

/// All state the controller serializes behind a single mutex: the active
/// map, usage table, pin set, reverse index, and toolset registrations are
/// coupled and must not be locked independently.
struct Inner {
    registrations: HashMap<String, ToolsetRegistration>,
    active: ToolMap,
    owner_of_active_tool: HashMap<String, String>,
    usage: HashMap<String, UsageEntry>,
    pinned: HashSet<String>,
    reverse_index: ReverseIndex,
    reverse_index_built: bool,
}

impl Inner {
    fn tool_names_for(&self, toolset_id: &str) -> Vec<String> {
        self.owner_of_active_tool
            .iter()
            .filter(|(_, owner)| owner.as_str() == toolset_id)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Dynamic toolset activation, TTL/LRU eviction, pin/unpin, and auto-enable
/// on call.
pub struct ToolGateController {
    inner: Mutex<Inner>,
    /// In-flight enable barrier, keyed by toolset id, so concurrent
    /// `ensure_tool_available` calls for the same toolset share one loader
    /// invocation.
    inflight: DashMap<String, Arc<Notify>>,
    config: GateConfig,
    filter_config: FilterChainConfig,
    events: EventBus,
}

impl ToolGateController {
    /// Construct a controller with no registered toolsets, publishing
    /// lifecycle events (auto-enable, TTL/LRU auto-disable) on `events`.
    #[must_use]
    pub fn new(config: GateConfig, filter_config: FilterChainConfig, events: EventBus) -> Self {
        Self {
            inner: Mutex::new(Inner {
                registrations: HashMap::new(),
                active: ToolMap::new(),
                owner_of_active_tool: HashMap::new(),
                usage: HashMap::new(),
                pinned: HashSet::new(),
                reverse_index: ReverseIndex::new(config.auto_enable_case_insensitive),
                reverse_index_built: false,
            }),
            inflight: DashMap::new(),
            config,
            filter_config,
            events,
        }
    }

    /// Register a toolset. Does not load it.
    pub async fn register_toolset(&self, registration: ToolsetRegistration) {
        let mut inner = self.inner.lock().await;
        inner.reverse_index_built = false;
        inner.registrations.insert(registration.id.clone(), registration);
    }

    /// Ids of every registered toolset, active or not.
    pub async fn list_toolsets(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.registrations.keys().cloned().collect()
    }

    async fn ensure_reverse_index_built(&self) {
        let mut inner = self.inner.lock().await;
        if inner.reverse_index_built {
            return;
        }
        let manifests: Vec<(String, Vec<String>)> = inner
            .registrations
            .values()
            .filter_map(|r| r.manifest.as_ref().map(|m| (r.id.clone(), m.tools.clone())))
            .collect();
        for (id, tools) in manifests {
            inner.reverse_index.register_manifest(&id, &tools);
        }
        inner.reverse_index_built = true;
    }

    /// Enable a toolset by id. Idempotent. Loads via its loader, optimizes
    /// every returned descriptor, checks for name collisions against the
    /// currently active map, and (only if collision-free) inserts every
    /// descriptor and records activation.
    ///
    /// # Errors
    /// [`GateError::UnknownToolset`] if no loader is registered;
    /// [`GateError::Collision`] if a returned tool name is already owned by
    /// a different active toolset; any error the loader itself returns.
    pub async fn enable_toolset(&self, id: &str) -> GateResult<Vec<String>> {
        loop {
            {
                let inner = self.inner.lock().await;
                if inner.usage.contains_key(id) {
                    return Ok(inner.tool_names_for(id));
                }
            }

            let (is_leader, notify) = match self.inflight.entry(id.to_owned()) {
                DashEntry::Occupied(e) => (false, e.get().clone()),
                DashEntry::Vacant(e) => {
                    let notify = Arc::new(Notify::new());
                    e.insert(notify.clone());
                    (true, notify)
                }
            };

            if !is_leader {
                notify.notified().await;
                continue;
            }

            let result = self.do_enable(id).await;
            notify.notify_waiters();
            self.inflight.remove(id);
            return result;
        }
    }

    async fn do_enable(&self, id: &str) -> GateResult<Vec<String>> {
        let loader = {
            let inner = self.inner.lock().await;
            inner
                .registrations
                .get(id)
                .map(|r| r.loader.clone())
                .ok_or_else(|| GateError::UnknownToolset(id.to_owned()))?
        };

        let loaded = loader.load().await?;
        let optimized: HashMap<_, _> = loaded
            .into_iter()
            .map(|(name, tool)| (name, crate::schema::optimize(&tool)))
            .collect();

        let mut inner = self.inner.lock().await;
        if inner.usage.contains_key(id) {
            return Ok(inner.tool_names_for(id));
        }

        for name in optimized.keys() {
            if let Some(owner) = inner.owner_of_active_tool.get(name) {
                if owner != id {
                    warn!(toolset = id, tool = name, owner, "tool name collision on enable");
                    return Err(GateError::Collision(name.clone()));
                }
            }
        }

        let mut names = Vec::with_capacity(optimized.len());
        for (name, tool) in optimized {
            inner.owner_of_active_tool.insert(name.clone(), id.to_owned());
            inner.reverse_index.set_current(&name, id);
            inner.active.insert(name.clone(), tool);
            names.push(name);
        }
        inner.usage.insert(id.to_owned(), UsageEntry { last_used_at_millis: now_millis() });
        drop(inner);

        info!(toolset = id, tools = names.len(), "toolset enabled");
        self.enforce_lru_cap().await;
        Ok(names)
    }

    /// Disable a toolset: idempotent, removes every descriptor it provided
    /// and drops its usage entry. Disabling a pinned toolset is explicitly
    /// allowed -- pinning only prevents *automatic* disable.
    pub async fn disable_toolset(&self, id: &str) -> GateResult<Vec<String>> {
        let mut inner = self.inner.lock().await;
        if !inner.usage.contains_key(id) {
            return Ok(Vec::new());
        }
        let names = inner.tool_names_for(id);
        for name in &names {
            inner.active.shift_remove(name);
            inner.owner_of_active_tool.remove(name);
            inner.reverse_index.clear_current(name);
        }
        inner.usage.remove(id);
        debug!(toolset = id, tools = names.len(), "toolset disabled");
        Ok(names)
    }

    /// Refresh `lastUsedAt` of the toolset currently owning `tool_name`, if any.
    pub async fn mark_used(&self, tool_name: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(owner) = inner.owner_of_active_tool.get(tool_name).cloned() {
            if let Some(entry) = inner.usage.get_mut(&owner) {
                entry.last_used_at_millis = now_millis();
            }
        }
    }

    /// Returns whether `tool_name` is available for calling *right now*,
    /// auto-enabling its owning toolset if policy allows.
    ///
    /// # Errors
    /// [`GateError::Ambiguous`] under the `error` conflict-resolution policy
    /// when more than one toolset claims the name.
    pub async fn ensure_tool_available(&self, tool_name: &str, _ctx: &FilterContext) -> GateResult<bool> {
        {
            let inner = self.inner.lock().await;
            if inner.owner_of_active_tool.contains_key(tool_name) {
                drop(inner);
                self.mark_used(tool_name).await;
                return Ok(true);
            }
        }

        self.ensure_reverse_index_built().await;

        let (owners, normalized) = {
            let inner = self.inner.lock().await;
            (
                inner.reverse_index.potential_owners(tool_name).to_vec(),
                inner.reverse_index.normalize(tool_name),
            )
        };
        if owners.is_empty() {
            return Ok(false);
        }

        let target = {
            let inner = self.inner.lock().await;
            match self.config.conflict_resolution {
                ConflictResolution::FirstMatch => owners[0].clone(),
                ConflictResolution::PreferEnabled => owners
                    .iter()
                    .find(|id| inner.usage.contains_key(id.as_str()))
                    .cloned()
                    .unwrap_or_else(|| owners[0].clone()),
                ConflictResolution::Error => {
                    if owners.len() > 1 {
                        return Err(GateError::Ambiguous(tool_name.to_owned()));
                    }
                    owners[0].clone()
                }
            }
        };

        if !self.config.auto_enable_on_call {
            return Ok(false);
        }
        if matches_any(&self.config.auto_enable_blocklist, &normalized) {
            return Ok(false);
        }
        if !self.config.auto_enable_allowlist.is_empty()
            && !matches_any(&self.config.auto_enable_allowlist, &normalized)
        {
            return Ok(false);
        }

        match self.enable_toolset(&target).await {
            Ok(_) => {
                self.mark_used(tool_name).await;
                self.events.publish(Event::GateAutoEnable { toolset: target.clone() });
                Ok(true)
            }
            // Loader failures during auto-enable bubble up as tool-not-found
            // to the caller; the manifest index is left intact
            // so a later call can retry.
            Err(err) => {
                warn!(toolset = target, tool = tool_name, error = %err, "auto-enable failed");
                Ok(false)
            }
        }
    }

    /// Disable every active, unpinned toolset whose `lastUsedAt` exceeds the
    /// configured TTL. Snapshots victims before disabling so no I/O happens
    /// while the controller lock is held.
    pub async fn sweep_expired(&self) -> Vec<String> {
        let now = now_millis();
        let victims: Vec<String> = {
            let inner = self.inner.lock().await;
            inner
                .usage
                .iter()
                .filter(|(id, entry)| {
                    !inner.pinned.contains(*id) && now - entry.last_used_at_millis >= self.config.ttl_millis
                })
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in &victims {
            match self.disable_toolset(id).await {
                Ok(_) => self.events.publish(Event::GateAutoDisableTtl { toolset: id.clone() }),
                Err(err) => warn!(toolset = id, error = %err, "ttl sweep failed to disable toolset"),
            }
        }
        if !victims.is_empty() {
            info!(count = victims.len(), "ttl sweep disabled toolsets");
        }
        victims
    }

    /// While more than `max_active_toolsets` are active, disable the oldest
    /// unpinned toolset. `max_active_toolsets == 0` means unlimited
    ///.
    pub async fn enforce_lru_cap(&self) -> Vec<String> {
        if self.config.max_active_toolsets == 0 {
            return Vec::new();
        }
        let mut disabled = Vec::new();
        loop {
            let victim = {
                let inner = self.inner.lock().await;
                if inner.usage.len() <= self.config.max_active_toolsets {
                    None
                } else {
                    inner
                        .usage
                        .iter()
                        .filter(|(id, _)| !inner.pinned.contains(*id))
                        .min_by_key(|(_, entry)| entry.last_used_at_millis)
                        .map(|(id, _)| id.clone())
                }
            };
            match victim {
                Some(id) => {
                    if self.disable_toolset(&id).await.is_ok() {
                        self.events.publish(Event::GateAutoDisableLru { toolset: id.clone() });
                        disabled.push(id);
                    } else {
                        break;
                    }
                }
                None => break,
            }
        }
        disabled
    }

    /// Pin a toolset. Allowed even if it is not currently active; prevents
    /// it being evicted by TTL or LRU once it is enabled.
    pub async fn pin(&self, id: &str) {
        self.inner.lock().await.pinned.insert(id.to_owned());
    }

    /// Unpin a toolset.
    pub async fn unpin(&self, id: &str) {
        self.inner.lock().await.pinned.remove(id);
    }

    /// Currently pinned toolset ids.
    pub async fn pinned(&self) -> Vec<String> {
        self.inner.lock().await.pinned.iter().cloned().collect()
    }

    /// Run the Filter Chain over the active map.
    pub async fn available_tools(&self, ctx: &FilterContext) -> ToolMap {
        let inner = self.inner.lock().await;
        crate::tools::filter::run_chain(&inner.active, ctx, &self.filter_config)
    }

    /// Usage snapshot for the `gate/usage_stats` built-in tool:
    /// `toolset id -> (last_used_at_millis, pinned)`.
    pub async fn usage_stats(&self) -> HashMap<String, (i64, bool)> {
        let inner = self.inner.lock().await;
        inner
            .usage
            .iter()
            .map(|(id, entry)| (id.clone(), (entry.last_used_at_millis, inner.pinned.contains(id))))
            .collect()
    }

    /// Ids of toolsets currently active.
    pub async fn active_toolsets(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.usage.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::toolset::{StaticLoader, ToolsetManifest, ToolsetRegistration};
    use crate::tools::ToolDescriptor;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, "d", json!({"type": "object"}))
    }

    fn manifest(id: &str, tools: &[&str]) -> ToolsetManifest {
        ToolsetManifest {
            id: id.to_owned(),
            name: id.to_owned(),
            description: None,
            tools: tools.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn enabling_unknown_toolset_fails() {
        let ctrl = ToolGateController::new(GateConfig::default(), FilterChainConfig::default(), EventBus::default());
        let err = ctrl.enable_toolset("nope").await.unwrap_err();
        assert!(matches!(err, GateError::UnknownToolset(_)));
    }

    #[tokio::test]
    async fn enable_is_idempotent() {
        let ctrl = ToolGateController::new(GateConfig::default(), FilterChainConfig::default(), EventBus::default());
        ctrl.register_toolset(ToolsetRegistration::without_manifest(
            "s1",
            Arc::new(StaticLoader::new([tool("a")])),
        ))
        .await;
        let first = ctrl.enable_toolset("s1").await.unwrap();
        let second = ctrl.enable_toolset("s1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn collision_aborts_whole_enable() {
        let ctrl = ToolGateController::new(GateConfig::default(), FilterChainConfig::default(), EventBus::default());
        ctrl.register_toolset(ToolsetRegistration::without_manifest(
            "s1",
            Arc::new(StaticLoader::new([tool("shared")])),
        ))
        .await;
        ctrl.register_toolset(ToolsetRegistration::without_manifest(
            "s2",
            Arc::new(StaticLoader::new([tool("shared"), tool("unique")])),
        ))
        .await;
        ctrl.enable_toolset("s1").await.unwrap();
        let err = ctrl.enable_toolset("s2").await.unwrap_err();
        assert!(matches!(err, GateError::Collision(_)));
        // no partial insertion: "unique" must not be active either
        let ctx = FilterContext::default();
        assert!(!ctrl.available_tools(&ctx).await.contains_key("unique"));
    }

    #[tokio::test]
    async fn s6_pin_prevents_ttl_disable() {
        let cfg = GateConfig { ttl_millis: 20, ..GateConfig::default() };
        let ctrl = ToolGateController::new(cfg, FilterChainConfig::default(), EventBus::default());
        ctrl.register_toolset(ToolsetRegistration::without_manifest(
            "s1",
            Arc::new(StaticLoader::new([tool("a")])),
        ))
        .await;
        ctrl.enable_toolset("s1").await.unwrap();
        ctrl.pin("s1").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let disabled = ctrl.sweep_expired().await;
        assert!(disabled.is_empty());
        assert!(ctrl.active_toolsets().await.contains(&"s1".to_owned()));
    }

    #[tokio::test]
    async fn s3_ttl_disables_unpinned() {
        let cfg = GateConfig { ttl_millis: 20, ..GateConfig::default() };
        let ctrl = ToolGateController::new(cfg, FilterChainConfig::default(), EventBus::default());
        ctrl.register_toolset(ToolsetRegistration::without_manifest(
            "s1",
            Arc::new(StaticLoader::new([tool("a")])),
        ))
        .await;
        ctrl.enable_toolset("s1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        let disabled = ctrl.sweep_expired().await;
        assert_eq!(disabled, vec!["s1".to_owned()]);
    }

    #[tokio::test]
    async fn s5_lru_eviction_keeps_newest() {
        let cfg = GateConfig { max_active_toolsets: 3, ..GateConfig::default() };
        let ctrl = ToolGateController::new(cfg, FilterChainConfig::default(), EventBus::default());
        for id in ["setA", "setB", "setC", "setD"] {
            ctrl.register_toolset(ToolsetRegistration::without_manifest(
                id,
                Arc::new(StaticLoader::new([tool(&format!("{id}/tool"))])),
            ))
            .await;
            ctrl.enable_toolset(id).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let mut active = ctrl.active_toolsets().await;
        active.sort();
        assert_eq!(active, vec!["setB".to_owned(), "setC".to_owned(), "setD".to_owned()]);
    }

    #[tokio::test]
    async fn s7_concurrent_auto_enable_loads_once() {
        struct CountingLoader {
            calls: Arc<AtomicUsize>,
        }
        #[async_trait::async_trait]
        impl super::super::toolset::ToolsetLoader for CountingLoader {
            async fn load(&self) -> GateResult<HashMap<String, ToolDescriptor>> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(HashMap::from([("foo".to_owned(), tool("foo"))]))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let ctrl = Arc::new(ToolGateController::new(GateConfig::default(), FilterChainConfig::default(), EventBus::default()));
        ctrl.register_toolset(ToolsetRegistration::new(
            "s1",
            manifest("s1", &["foo"]),
            Arc::new(CountingLoader { calls: calls.clone() }),
        ))
        .await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ctrl = ctrl.clone();
            handles.push(tokio::spawn(async move {
                ctrl.ensure_tool_available("foo", &FilterContext::default()).await.unwrap()
            }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }
        assert!(results.iter().all(|r| *r));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ctrl.active_toolsets().await.contains(&"s1".to_owned()));
    }

    #[tokio::test]
    async fn conflict_resolution_error_throws_ambiguous() {
        let cfg = GateConfig { conflict_resolution: ConflictResolution::Error, ..GateConfig::default() };
        let ctrl = ToolGateController::new(cfg, FilterChainConfig::default(), EventBus::default());
        ctrl.register_toolset(ToolsetRegistration::new(
            "s1",
            manifest("s1", &["dup"]),
            Arc::new(StaticLoader::new([tool("dup")])),
        ))
        .await;
        ctrl.register_toolset(ToolsetRegistration::new(
            "s2",
            manifest("s2", &["dup"]),
            Arc::new(StaticLoader::new([tool("dup")])),
        ))
        .await;
        let err = ctrl.ensure_tool_available("dup", &FilterContext::default()).await.unwrap_err();
        assert!(matches!(err, GateError::Ambiguous(_)));
    }

    #[tokio::test]
    async fn auto_enable_respects_blocklist() {
        let cfg = GateConfig {
            auto_enable_blocklist: vec!["foo".to_owned()],
            ..GateConfig::default()
        };
        let ctrl = ToolGateController::new(cfg, FilterChainConfig::default(), EventBus::default());
        ctrl.register_toolset(ToolsetRegistration::new(
            "s1",
            manifest("s1", &["foo"]),
            Arc::new(StaticLoader::new([tool("foo")])),
        ))
        .await;
        let available = ctrl.ensure_tool_available("foo", &FilterContext::default()).await.unwrap();
        assert!(!available);
    }

    #[tokio::test]
    async fn auto_enable_respects_allowlist_prefix() {
        let cfg = GateConfig {
            auto_enable_allowlist: vec!["fs/*".to_owned()],
            ..GateConfig::default()
        };
        let ctrl = ToolGateController::new(cfg, FilterChainConfig::default(), EventBus::default());
        ctrl.register_toolset(ToolsetRegistration::new(
            "s1",
            manifest("s1", &["other/tool"]),
            Arc::new(StaticLoader::new([tool("other/tool")])),
        ))
        .await;
        let available = ctrl
            .ensure_tool_available("other/tool", &FilterContext::default())
            .await
            .unwrap();
        assert!(!available);
    }

    #[tokio::test]
    async fn auto_enable_publishes_event_with_real_toolset_id() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let ctrl = ToolGateController::new(GateConfig::default(), FilterChainConfig::default(), events);
        ctrl.register_toolset(ToolsetRegistration::new(
            "s1",
            manifest("s1", &["foo"]),
            Arc::new(StaticLoader::new([tool("foo")])),
        ))
        .await;

        ctrl.ensure_tool_available("foo", &FilterContext::default()).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::GateAutoEnable { toolset } if toolset == "s1"));
    }

    #[tokio::test]
    async fn ttl_sweep_publishes_auto_disable_event() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let cfg = GateConfig { ttl_millis: 20, ..GateConfig::default() };
        let ctrl = ToolGateController::new(cfg, FilterChainConfig::default(), events);
        ctrl.register_toolset(ToolsetRegistration::without_manifest(
            "s1",
            Arc::new(StaticLoader::new([tool("a")])),
        ))
        .await;
        ctrl.enable_toolset("s1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        ctrl.sweep_expired().await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::GateAutoDisableTtl { toolset } if toolset == "s1"));
    }
}
