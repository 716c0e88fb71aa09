// ABOUTME: Unified error handling with machine-readable codes and JSON-RPC mapping
// ABOUTME: Provides AppError, AppResult, and the wire-level error taxonomy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Unified error handling for the server core.
//!
//! Every failure surfaced to a caller carries a machine-readable
//! [`ErrorCode`] plus a human-readable message. Failures local to one
//! invocation (parse errors, unknown tools, permission checks) are converted
//! into structured responses on the originating channel; failures affecting a
//! whole channel trigger the restart/removal policies in the transport layer.

use serde::{Deserialize, Serialize};

/// Result alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A wire message could not be parsed
    ParseError,
    /// Request was structurally valid JSON but not a valid request
    InvalidRequest,
    /// Tool or method name is unknown
    NotFound,
    /// Request parameters failed validation
    InvalidParams,
    /// Caller lacks the capability required by the tool
    PermissionDenied,
    /// Caller identity could not be established from the credential
    Unauthorized,
    /// An issued request got no matching response in time
    Timeout,
    /// The owning channel closed while the request was outstanding
    ConnectionClosed,
    /// I/O failure on a transport channel
    Transport,
    /// Internal invariant violation or unexpected failure
    Internal,
}

impl ErrorCode {
    /// JSON-RPC 2.0 numeric code for this error class.
    ///
    /// Standard codes for the protocol-defined classes, implementation-defined
    /// codes (-32000 range) for the rest.
    #[must_use]
    pub const fn jsonrpc_code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::NotFound => -32601,
            Self::InvalidParams => -32602,
            Self::Internal => -32603,
            Self::PermissionDenied => -32001,
            Self::Unauthorized => -32002,
            Self::Timeout => -32003,
            Self::ConnectionClosed => -32004,
            Self::Transport => -32005,
        }
    }
}

/// Application error carrying a code and a human-readable message
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    /// Machine-readable error classification
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
}

impl AppError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Malformed wire input
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    /// Structurally invalid request
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Unknown tool or method
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Invalid request parameters
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    /// Capability check failed
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Credential validation failed
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Correlation timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    /// Owning channel terminated
    pub fn connection_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConnectionClosed, message)
    }

    /// Channel-level I/O failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, message)
    }

    /// Internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}
