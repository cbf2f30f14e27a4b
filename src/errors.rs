// ABOUTME: Centralized error handling and error types for the toolgate proxy
// ABOUTME: Defines all error variants and their JSON-RPC 2.0 error-code mapping
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Unified error type for every component of the proxy.
//!
//! Mirrors the split between a full internal error (safe for `tracing::warn!`)
//! and a sanitized, wire-visible message: callers should log
//! [`GateError::internal_details`] and send [`GateError::sanitized_message`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jsonrpc::error_codes;

/// Coarse classification of a [`GateError`], used to pick a JSON-RPC code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Session has not sent `initialize` yet.
    NotInitialized,
    /// Admission was denied by the rate limiter or circuit breaker.
    FlowControl,
    /// Caller-supplied input failed validation.
    InvalidInput,
    /// A referenced tool, toolset, or backend does not exist.
    NotFound,
    /// The requested JSON-RPC method is not implemented by this server.
    MethodNotFound,
    /// A tool name resolves to more than one toolset under the `error` policy.
    Ambiguous,
    /// A named tool already belongs to another active toolset.
    Collision,
    /// A backend rejected or failed a call.
    BackendError,
    /// Any other internal failure.
    Internal,
}

impl ErrorCode {
    /// The JSON-RPC 2.0 error code this classification maps to.
    #[must_use]
    pub const fn rpc_code(self) -> i32 {
        match self {
            Self::NotInitialized => error_codes::NOT_INITIALIZED,
            Self::FlowControl => error_codes::SERVER_ERROR,
            Self::InvalidInput => error_codes::INVALID_PARAMS,
            Self::NotFound | Self::Ambiguous | Self::Collision | Self::BackendError => {
                error_codes::SERVER_ERROR
            }
            Self::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            Self::Internal => error_codes::INTERNAL_ERROR,
        }
    }
}

/// The error type threaded through every layer of the proxy.
#[derive(Debug, Clone, Error)]
pub enum GateError {
    /// No `initialize` call has succeeded yet for this session.
    #[error("session not initialized")]
    NotInitialized,

    /// Request was rejected by the load balancer (rate limit or open breaker).
    #[error("request denied: {reason}")]
    FlowControl {
        /// Human-readable reason (e.g. "rate limit exceeded", "circuit open").
        reason: String,
    },

    /// Generic invalid-input error (empty name, malformed config, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `addTool`/`executeTool` validation: input is not an object per schema.
    #[error("input is not an object")]
    NotAnObject,

    /// Validation: a property not declared in `schema.properties` was supplied
    /// and `additionalProperties` is not `true`.
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// Validation: a property listed in `required` was not supplied.
    #[error("missing required property: {0}")]
    MissingRequired(String),

    /// Validation: a declared primitive type did not match the supplied value.
    #[error("type mismatch for property {property}: expected {expected}")]
    TypeMismatch {
        /// Offending property name.
        property: String,
        /// Declared JSON-Schema primitive type.
        expected: String,
    },

    /// No loader is registered for the named toolset.
    #[error("unknown toolset: {0}")]
    UnknownToolset(String),

    /// A tool name is already owned by a different active toolset.
    #[error("tool name collision: {0}")]
    Collision(String),

    /// A tool name resolves to more than one candidate toolset under the
    /// `error` conflict-resolution policy.
    #[error("ambiguous tool owner: {0}")]
    Ambiguous(String),

    /// A named tool, toolset, backend, or session was not found.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What kind of thing was missing (`"tool"`, `"toolset"`, `"backend"`, ...).
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// The client manager has no connection registered under this name.
    #[error("no connection to backend: {0}")]
    NoConnection(String),

    /// The requested JSON-RPC method name has no handler.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// A backend returned an error or failed during a call.
    #[error("[ProxyService] server={server} tool={tool}: {source}")]
    Backend {
        /// Backend (server) name the call was routed to.
        server: String,
        /// Tool name that was being called.
        tool: String,
        /// Underlying error text from the backend or transport.
        source: String,
    },

    /// Transport-level failure (disconnect, timeout, parse error).
    #[error("transport error: {0}")]
    Transport(String),

    /// A loader or future timed out.
    #[error("request timeout")]
    Timeout,

    /// Catch-all for unexpected internal failures.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Classify this error for JSON-RPC code mapping.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::FlowControl { .. } => ErrorCode::FlowControl,
            Self::InvalidInput(_)
            | Self::NotAnObject
            | Self::UnknownProperty(_)
            | Self::MissingRequired(_)
            | Self::TypeMismatch { .. } => ErrorCode::InvalidInput,
            Self::UnknownToolset(_) | Self::NotFound { .. } | Self::NoConnection(_) => {
                ErrorCode::NotFound
            }
            Self::MethodNotFound(_) => ErrorCode::MethodNotFound,
            Self::Collision(_) => ErrorCode::Collision,
            Self::Ambiguous(_) => ErrorCode::Ambiguous,
            Self::Backend { .. } => ErrorCode::BackendError,
            Self::Transport(_) | Self::Timeout | Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// The JSON-RPC 2.0 error code for this error.
    #[must_use]
    pub const fn rpc_code(&self) -> i32 {
        self.code().rpc_code()
    }

    /// Message safe to place on the wire. For most variants this is already
    /// descriptive and safe; only raw internal failures are generalized.
    #[must_use]
    pub fn sanitized_message(&self) -> String {
        match self {
            Self::Internal(_) | Self::Transport(_) => "internal server error".to_owned(),
            other => other.to_string(),
        }
    }

    /// Full detail, safe only for server-side logs.
    #[must_use]
    pub fn internal_details(&self) -> String {
        format!("{:?}: {self}", self.code())
    }

    /// Convenience constructor for a not-found error.
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Convenience constructor for a backend failure.
    #[must_use]
    pub fn backend(
        server: impl Into<String>,
        tool: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self::Backend {
            server: server.into(),
            tool: tool.into(),
            source: source.into(),
        }
    }
}

impl From<std::io::Error> for GateError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<anyhow::Error> for GateError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias used throughout the crate.
pub type GateResult<T> = Result<T, GateError>;
