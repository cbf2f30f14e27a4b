// ABOUTME: Rate limiting, circuit breaking, and bounded request admission in front of backends
// ABOUTME: Rate limiting is global per proxy
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::errors::GateError;

/// Configuration for the [`LoadBalancer`].
#[derive(Debug, Clone)]
pub struct LoadBalancerConfig {
    /// Global admission rate, requests per second.
    pub max_requests_per_second: u32,
    /// Consecutive failures before a breaker opens.
    pub circuit_breaker_threshold: u32,
    /// How long a breaker stays open before allowing a half-open probe.
    pub circuit_breaker_timeout: Duration,
    /// Maximum number of requests allowed to queue for admission.
    pub max_queue_depth: usize,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: 100,
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_secs(30),
            max_queue_depth: 256,
        }
    }
}

/// Circuit breaker status per backend+method key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    /// Requests admitted normally.
    Closed,
    /// Requests rejected outright.
    Open,
    /// A single probe request is allowed through.
    HalfOpen,
}

struct BreakerState {
    status: std::sync::Mutex<BreakerStatus>,
    failure_count: AtomicU32,
    opened_at: AtomicI64,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            status: std::sync::Mutex::new(BreakerStatus::Closed),
            failure_count: AtomicU32::new(0),
            opened_at: AtomicI64::new(0),
        }
    }
}

/// Fixed-window-per-second rate limiter, backend+method circuit breaker, and
/// a bounded semaphore-based admission queue.
pub struct LoadBalancer {
    config: LoadBalancerConfig,
    window_start: std::sync::Mutex<Instant>,
    window_count: AtomicU32,
    breakers: DashMap<(String, String), BreakerState>,
    queue: Semaphore,
}

impl LoadBalancer {
    /// Construct a load balancer from the given config.
    #[must_use]
    pub fn new(config: LoadBalancerConfig) -> Self {
        let queue_permits = config.max_queue_depth;
        Self {
            config,
            window_start: std::sync::Mutex::new(Instant::now()),
            window_count: AtomicU32::new(0),
            breakers: DashMap::new(),
            queue: Semaphore::new(queue_permits),
        }
    }

    fn check_rate_limit(&self) -> Result<(), GateError> {
        let mut window_start = self.window_start.lock().expect("window_start mutex poisoned");
        if window_start.elapsed() >= Duration::from_secs(1) {
            *window_start = Instant::now();
            self.window_count.store(0, Ordering::SeqCst);
        }
        drop(window_start);

        let count = self.window_count.fetch_add(1, Ordering::SeqCst) + 1;
        if count > self.config.max_requests_per_second {
            return Err(GateError::FlowControl { reason: "rate limit exceeded".into() });
        }
        Ok(())
    }

    fn breaker_key(backend: &str, method: &str) -> (String, String) {
        (backend.to_owned(), method.to_owned())
    }

    fn check_breaker(&self, backend: &str, method: &str) -> Result<bool, GateError> {
        let key = Self::breaker_key(backend, method);
        let entry = self.breakers.entry(key).or_insert_with(BreakerState::new);
        let mut status = entry.status.lock().expect("breaker mutex poisoned");

        match *status {
            BreakerStatus::Closed => Ok(false),
            BreakerStatus::Open => {
                let opened_at = entry.opened_at.load(Ordering::SeqCst);
                let elapsed_ms = chrono_now_millis() - opened_at;
                if elapsed_ms >= self.config.circuit_breaker_timeout.as_millis() as i64 {
                    *status = BreakerStatus::HalfOpen;
                    debug!(backend, method, "circuit breaker entering half-open");
                    Ok(true)
                } else {
                    Err(GateError::FlowControl { reason: "circuit breaker open".into() })
                }
            }
            BreakerStatus::HalfOpen => {
                // Only one probe is admitted; callers arriving while a probe
                // is outstanding are rejected until it resolves.
                Err(GateError::FlowControl { reason: "circuit breaker open".into() })
            }
        }
    }

    /// Admit a request for `backend`/`method`. Returns `Ok(())` if admitted,
    /// or a [`GateError::FlowControl`] if rate-limited or the breaker is open.
    ///
    /// # Errors
    /// See above.
    pub async fn admit(&self, backend: &str, method: &str) -> Result<QueuePermit<'_>, GateError> {
        self.check_rate_limit()?;
        self.check_breaker(backend, method)?;

        let permit = self
            .queue
            .try_acquire()
            .map_err(|_| GateError::FlowControl { reason: "request queue full".into() })?;
        Ok(QueuePermit { _permit: permit })
    }

    /// Record the outcome of a request routed to `backend`/`method`.
    pub fn record_outcome(&self, backend: &str, method: &str, ok: bool) {
        let key = Self::breaker_key(backend, method);
        let entry = self.breakers.entry(key).or_insert_with(BreakerState::new);
        let mut status = entry.status.lock().expect("breaker mutex poisoned");

        if ok {
            entry.failure_count.store(0, Ordering::SeqCst);
            if *status != BreakerStatus::Closed {
                debug!(backend, method, "circuit breaker closing after success");
            }
            *status = BreakerStatus::Closed;
            return;
        }

        let failures = entry.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        if *status == BreakerStatus::HalfOpen || failures >= self.config.circuit_breaker_threshold {
            *status = BreakerStatus::Open;
            entry.opened_at.store(chrono_now_millis(), Ordering::SeqCst);
            warn!(backend, method, failures, "circuit breaker opened");
        }
    }

    /// Current breaker status for a backend+method pair, for diagnostics.
    #[must_use]
    pub fn breaker_status(&self, backend: &str, method: &str) -> BreakerStatus {
        let key = Self::breaker_key(backend, method);
        self.breakers
            .get(&key)
            .map(|entry| *entry.status.lock().expect("breaker mutex poisoned"))
            .unwrap_or(BreakerStatus::Closed)
    }
}

fn chrono_now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// RAII admission slot. Releases its queue permit on drop.
pub struct QueuePermit<'a> {
    _permit: tokio::sync::SemaphorePermit<'a>,
}
