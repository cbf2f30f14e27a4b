// ABOUTME: Per-connection session state: activity tracking, idle expiry, maxSessions LRU eviction
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Which transport a session was established over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    Stdio,
    /// One JSON-RPC message per HTTP POST.
    Http,
    /// Persistent JSON-RPC over a WebSocket connection.
    WebSocket,
}

/// Client-supplied identification from `initialize` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client-reported name.
    pub name: String,
    /// Client-reported version.
    pub version: String,
}

/// Per-connection session state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session id.
    pub id: Uuid,
    /// Transport this session was established over.
    pub transport: TransportKind,
    /// Whether `initialize` has completed for this session.
    pub is_initialized: bool,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last time any request was received on this session.
    pub last_activity_at: DateTime<Utc>,
    /// Client info negotiated at `initialize`, if any.
    pub client_info: Option<ClientInfo>,
    /// Bearer token presented by the client, if any.
    pub auth_token: Option<String>,
}

impl Session {
    fn new(transport: TransportKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            transport,
            is_initialized: false,
            created_at: now,
            last_activity_at: now,
            client_info: None,
            auth_token: None,
        }
    }
}

/// Creates and tracks [`Session`]s, enforcing an idle timeout and a maximum
/// session count. Backed by an `lru::LruCache` guarded by a
/// single mutex, mirroring the reference server's session-cache pattern:
/// touching a session on every access keeps the least-recently-used entry at
/// the tail, so capacity eviction and idle-oldest-first eviction agree.
pub struct SessionManager {
    sessions: Mutex<LruCache<Uuid, Session>>,
    idle_timeout: chrono::Duration,
}

impl SessionManager {
    /// Construct a manager with the given capacity and idle timeout.
    #[must_use]
    pub fn new(max_sessions: usize, idle_timeout: std::time::Duration) -> Self {
        let capacity = std::num::NonZeroUsize::new(max_sessions.max(1))
            .unwrap_or_else(|| std::num::NonZeroUsize::new(1).expect("1 is nonzero"));
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            idle_timeout: chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::seconds(1800)),
        }
    }

    /// Create a new session for `transport`, evicting the least-recently-used
    /// existing session if at capacity.
    pub async fn create(&self, transport: TransportKind) -> Session {
        let session = Session::new(transport);
        let mut sessions = self.sessions.lock().await;
        sessions.put(session.id, session.clone());
        session
    }

    /// Fetch a session by id, refreshing its LRU position. Does not update
    /// `last_activity_at`; use [`Self::touch`] for that.
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Mark `initialize` complete and store negotiated client info.
    pub async fn initialize(&self, id: Uuid, client_info: ClientInfo) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id)?;
        session.is_initialized = true;
        session.client_info = Some(client_info);
        session.last_activity_at = Utc::now();
        Some(session.clone())
    }

    /// Refresh `last_activity_at` for an inbound request on this session.
    /// Every non-`initialize` request calls this first.
    pub async fn touch(&self, id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id)?;
        session.last_activity_at = Utc::now();
        Some(session.clone())
    }

    /// Explicitly terminate a session.
    pub async fn terminate(&self, id: Uuid) -> bool {
        self.sessions.lock().await.pop(&id).is_some()
    }

    /// Remove every session idle longer than the configured timeout. Returns
    /// the ids removed.
    pub async fn sweep_idle(&self) -> Vec<Uuid> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, s)| now - s.last_activity_at >= self.idle_timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            sessions.pop(id);
        }
        expired
    }

    /// Number of sessions currently tracked.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Shared handle type used throughout the server layer.
pub type SharedSessionManager = Arc<SessionManager>;
