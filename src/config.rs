// ABOUTME: Server configuration loaded from environment variables, plus the TOOL_FILTER_CONFIG file
// ABOUTME: Mirrors the reference server's config::environment::ServerConfig pattern
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::gate::{ConflictResolution, GateConfig};
use crate::loadbalancer::LoadBalancerConfig;
use crate::tools::FilterChainConfig;

/// Top-level process configuration, assembled from environment variables
/// with documented defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP transport listens on.
    pub http_port: u16,
    /// Port the WebSocket transport listens on.
    pub ws_port: u16,
    /// Maximum idle time before a session is evicted.
    pub session_idle_timeout: Duration,
    /// Maximum number of concurrently tracked sessions.
    pub max_sessions: usize,
    /// Interval between TTL sweep / LRU enforcement passes.
    pub sweep_interval: Duration,
    /// Gate Controller configuration.
    pub gate: GateConfig,
    /// Load Balancer configuration.
    pub load_balancer: LoadBalancerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8642,
            ws_port: 8643,
            session_idle_timeout: Duration::from_secs(1800),
            max_sessions: 1000,
            sweep_interval: Duration::from_secs(30),
            gate: GateConfig::default(),
            load_balancer: LoadBalancerConfig::default(),
        }
    }
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name).ok().map_or(default, |v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// documented defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_port: env_u16("TOOLGATE_HTTP_PORT", defaults.http_port),
            ws_port: env_u16("TOOLGATE_WS_PORT", defaults.ws_port),
            session_idle_timeout: Duration::from_millis(env_u64(
                "TOOLGATE_SESSION_IDLE_MS",
                defaults.session_idle_timeout.as_millis() as u64,
            )),
            max_sessions: env_usize("TOOLGATE_MAX_SESSIONS", defaults.max_sessions),
            sweep_interval: Duration::from_millis(env_u64(
                "TOOLGATE_SWEEP_INTERVAL_MS",
                defaults.sweep_interval.as_millis() as u64,
            )),
            gate: GateConfig {
                ttl_millis: env_u64("TOOLGATE_AUTO_DISABLE_TTL_MS", defaults.gate.ttl_millis as u64) as i64,
                max_active_toolsets: env_usize(
                    "TOOLGATE_MAX_ACTIVE_TOOLSETS",
                    defaults.gate.max_active_toolsets,
                ),
                auto_enable_on_call: env_bool("TOOLGATE_AUTO_ENABLE_ON_CALL", defaults.gate.auto_enable_on_call),
                auto_enable_case_insensitive: env_bool(
                    "TOOLGATE_AUTO_ENABLE_CASE_INSENSITIVE",
                    defaults.gate.auto_enable_case_insensitive,
                ),
                ..defaults.gate
            },
            load_balancer: LoadBalancerConfig {
                max_requests_per_second: env_u64(
                    "TOOLGATE_MAX_REQUESTS_PER_SECOND",
                    u64::from(defaults.load_balancer.max_requests_per_second),
                ) as u32,
                circuit_breaker_threshold: env_u64(
                    "TOOLGATE_CIRCUIT_BREAKER_THRESHOLD",
                    u64::from(defaults.load_balancer.circuit_breaker_threshold),
                ) as u32,
                ..defaults.load_balancer
            },
        }
    }
}

/// Shape of the `TOOL_FILTER_CONFIG` JSON file, covering the
/// Filter Chain plus the Gate Controller's auto-enable policy knobs.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ToolFilterFile {
    /// `TaskType`/`Resource`/`Security` filter configuration.
    #[serde(flatten)]
    pub filters: FilterChainConfig,
    /// TTL before an unpinned active toolset is auto-disabled, in milliseconds.
    #[serde(rename = "autoDisableTtlMs", default = "default_ttl_ms")]
    pub auto_disable_ttl_ms: i64,
    /// Maximum concurrently active toolsets; `0` = unlimited.
    #[serde(rename = "maxActiveToolsets", default)]
    pub max_active_toolsets: usize,
    /// Whether calling an unowned tool may auto-enable its toolset.
    #[serde(rename = "autoEnableOnCall", default = "default_true")]
    pub auto_enable_on_call: bool,
    /// Whether auto-enable name matching is case-insensitive.
    #[serde(rename = "autoEnableCaseInsensitive", default)]
    pub auto_enable_case_insensitive: bool,
    /// Conflict-resolution policy for ambiguous tool names.
    #[serde(rename = "autoEnableConflictResolution", default)]
    pub auto_enable_conflict_resolution: ConflictResolution,
    /// Patterns (`"p/*"` prefix supported) that may auto-enable.
    #[serde(rename = "autoEnableAllowlist", default)]
    pub auto_enable_allowlist: Vec<String>,
    /// Patterns that may never auto-enable.
    #[serde(rename = "autoEnableBlocklist", default)]
    pub auto_enable_blocklist: Vec<String>,
}

const fn default_ttl_ms() -> i64 {
    300_000
}

const fn default_true() -> bool {
    true
}

impl ToolFilterFile {
    /// Read and parse the file at `TOOL_FILTER_CONFIG`, or return defaults if
    /// the env var is unset.
    ///
    /// # Errors
    /// Returns an error if the env var is set but the file is missing or
    /// not valid JSON.
    pub fn load() -> Result<Self> {
        match env::var("TOOL_FILTER_CONFIG") {
            Ok(path) => Self::load_from(Path::new(&path)),
            Err(_) => Ok(Self::default_empty()),
        }
    }

    /// Read and parse a specific file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading TOOL_FILTER_CONFIG at {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing TOOL_FILTER_CONFIG at {}", path.display()))
    }

    fn default_empty() -> Self {
        Self {
            filters: FilterChainConfig::default(),
            auto_disable_ttl_ms: default_ttl_ms(),
            max_active_toolsets: 0,
            auto_enable_on_call: true,
            auto_enable_case_insensitive: false,
            auto_enable_conflict_resolution: ConflictResolution::default(),
            auto_enable_allowlist: Vec::new(),
            auto_enable_blocklist: Vec::new(),
        }
    }

    /// Build a [`GateConfig`] from this file's auto-enable policy fields.
    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            ttl_millis: self.auto_disable_ttl_ms,
            max_active_toolsets: self.max_active_toolsets,
            auto_enable_on_call: self.auto_enable_on_call,
            auto_enable_case_insensitive: self.auto_enable_case_insensitive,
            conflict_resolution: self.auto_enable_conflict_resolution,
            auto_enable_allowlist: self.auto_enable_allowlist.clone(),
            auto_enable_blocklist: self.auto_enable_blocklist.clone(),
        }
    }
}
