// ABOUTME: Unified JSON-RPC 2.0 request/response/error types for every transport
// ABOUTME: Shared by stdio, HTTP, and WebSocket so framing logic lives in one place
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # JSON-RPC 2.0 Foundation
//!
//! All three transports (stdio, HTTP, WebSocket) exchange the same wire
//! shapes defined here. A request carries a non-null `id`; a notification
//! omits `id`; a response echoes the request's `id` and carries exactly one
//! of `result` or `error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only JSON-RPC version this crate speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request or notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Method name to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Absent for notifications; present (string or integer) for requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request with an explicit id.
    #[must_use]
    pub fn with_id(method: impl Into<String>, params: Option<Value>, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }

    /// Build a notification (no id, no response expected).
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
            id: None,
        }
    }

    /// A notification has no `id`.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result`/`error` is `Some`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
    /// Echoes the request's id.
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    /// Build a success response.
    #[must_use]
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Build an error response.
    #[must_use]
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: None,
            error: Some(JsonRpcErrorObject::new(code, message)),
            id,
        }
    }

    /// Build this response from a [`crate::errors::GateError`].
    #[must_use]
    pub fn from_gate_error(id: Option<Value>, err: &crate::errors::GateError) -> Self {
        Self::error(id, err.rpc_code(), err.sanitized_message())
    }

    /// True if this is a success response.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    /// Build a new error object with no extra data.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Standard and proxy-specific JSON-RPC error codes.
pub mod error_codes {
    /// Malformed JSON.
    pub const PARSE_ERROR: i32 = -32700;
    /// Malformed JSON-RPC envelope.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Unknown method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid or missing params, or tool-input validation failure.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Unclassified internal failure.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Session has not completed `initialize`.
    pub const NOT_INITIALIZED: i32 = -32002;
    /// Rate limited, circuit open, or unknown tool.
    pub const SERVER_ERROR: i32 = -32000;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notification_has_no_id() {
        let n = JsonRpcRequest::notification("notifications/tools.listChanged", None);
        assert!(n.is_notification());
        let s = serde_json::to_string(&n).unwrap();
        assert!(!s.contains("\"id\""));
    }

    #[test]
    fn response_is_exclusive() {
        let ok = JsonRpcResponse::success(Some(json!(1)), json!({"a": 1}));
        assert!(ok.is_success());
        let err = JsonRpcResponse::error(Some(json!(1)), error_codes::INVALID_PARAMS, "bad");
        assert!(!err.is_success());
    }
}
