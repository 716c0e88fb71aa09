// ABOUTME: JSON-RPC 2.0 foundation types shared by every transport
// ABOUTME: Defines request/response/notification shapes and inbound frame classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Unified JSON-RPC 2.0 foundation for all protocols.
//!
//! Every transport carries the same logical protocol: requests with an id, a
//! method, and params; responses echoing the id with a result or an error;
//! notifications with a method but no id. The [`classify`] helper decides
//! whether an inbound frame is a request or a response destined for the
//! sampling peer.

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version string for all messages
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request (or notification, when `id` is absent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always "2.0"
    pub jsonrpc: String,
    /// Method name identifying the operation
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request id; absent for notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request with the given id
    #[must_use]
    pub fn new(id: Value, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }

    /// True when this request expects no response
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version, always "2.0"
    pub jsonrpc: String,
    /// Successful result payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Id of the request this answers
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    /// Build a success response
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    /// Build an error response from an [`AppError`]
    #[must_use]
    pub fn failure(id: Option<Value>, err: &AppError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: None,
            error: Some(JsonRpcError {
                code: err.code.jsonrpc_code(),
                message: err.message.clone(),
                data: Some(serde_json::json!({ "code": err.code })),
            }),
            id,
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code
    pub code: i32,
    /// Human-readable message
    pub message: String,
    /// Optional structured detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC notification (method + params, no id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol version, always "2.0"
    pub jsonrpc: String,
    /// Notification method name
    pub method: String,
    /// Notification payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Build a notification
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params: Some(params),
        }
    }
}

/// Classification of an inbound wire frame
#[derive(Debug)]
pub enum InboundFrame {
    /// A request (or notification) to dispatch
    Request(JsonRpcRequest),
    /// A response to an earlier server-issued request
    Response {
        /// Id echoed from the outbound request
        id: Value,
        /// Success payload, if any
        result: Option<Value>,
        /// Error payload, if any
        error: Option<JsonRpcError>,
    },
    /// Neither shape fit
    Malformed(AppError),
}

/// Classify an inbound frame as a request or a correlator response.
///
/// The classification is shape-sniffing and inherently heuristic: a frame
/// carrying an `id`, no `method`, and a `result` or `error` member is a
/// response; a frame with a `method` is a request. A frame with an `id` but
/// neither a `method` nor a `result`/`error` member is ambiguous and treated
/// as malformed rather than routed to the correlator.
#[must_use]
pub fn classify(value: &Value) -> InboundFrame {
    let Some(obj) = value.as_object() else {
        return InboundFrame::Malformed(AppError::invalid_request(
            "Expected a JSON object per message",
        ));
    };

    if obj.contains_key("method") {
        return match serde_json::from_value::<JsonRpcRequest>(value.clone()) {
            Ok(req) => InboundFrame::Request(req),
            Err(e) => InboundFrame::Malformed(AppError::invalid_request(format!(
                "Invalid request frame: {e}"
            ))),
        };
    }

    match obj.get("id") {
        Some(id) if obj.contains_key("result") || obj.contains_key("error") => {
            let error = obj
                .get("error")
                .and_then(|e| serde_json::from_value::<JsonRpcError>(e.clone()).ok());
            InboundFrame::Response {
                id: id.clone(),
                result: obj.get("result").cloned(),
                error,
            }
        }
        Some(_) => InboundFrame::Malformed(AppError::invalid_request(
            "Frame has an id but neither method nor result/error",
        )),
        None => InboundFrame::Malformed(AppError::invalid_request(
            "Frame has neither method nor id",
        )),
    }
}
