// ABOUTME: JSON-RPC method routing with per-request execution context construction
// ABOUTME: Handles initialize, ping, tools/list, and tools/call against the registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Request processor shared by the line channel and the HTTP channel.
//!
//! Builds a fresh [`ExecutionContext`] per invocation from the validated
//! bearer credential, dispatches through the registry, and converts failures
//! into structured error responses. Notifications (requests without an id)
//! produce no response.

use crate::context::ExecutionContext;
use crate::errors::{AppError, AppResult};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::resources::ServerResources;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Protocol version advertised by `initialize`
const PROTOCOL_VERSION: &str = "2025-03-26";

/// Routes decoded requests against the shared resources
#[derive(Clone)]
pub struct RequestProcessor {
    resources: Arc<ServerResources>,
}

impl RequestProcessor {
    /// Create a processor over the shared resource bundle
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Process one request.
    ///
    /// `bearer` is the transport-level credential (e.g. the Authorization
    /// header); a `token` request parameter takes precedence when present.
    /// Returns `None` for notifications.
    #[tracing::instrument(skip(self, request, bearer), fields(method = %request.method, request_id = ?request.id))]
    pub async fn process(
        &self,
        request: JsonRpcRequest,
        bearer: Option<&str>,
    ) -> Option<JsonRpcResponse> {
        let id = request.id.clone()?;

        let outcome = self.dispatch(&request, bearer).await;
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                debug!(method = %request.method, code = ?e.code, "Request failed: {}", e.message);
                JsonRpcResponse::failure(Some(id), &e)
            }
        })
    }

    async fn dispatch(&self, request: &JsonRpcRequest, bearer: Option<&str>) -> AppResult<Value> {
        match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_tools_list(request.params.as_ref(), bearer).await,
            "tools/call" => self.handle_tools_call(request.params.as_ref(), bearer).await,
            other => Err(AppError::not_found(format!("Unknown method: {other}"))),
        }
    }

    fn handle_initialize(&self) -> Value {
        info!("Client initialized");
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "beacon-mcp-server",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {
                "tools": {},
                "sampling": {},
            }
        })
    }

    async fn handle_tools_list(
        &self,
        params: Option<&Value>,
        bearer: Option<&str>,
    ) -> AppResult<Value> {
        let is_admin = match self.resolve_identity(params, bearer).await? {
            Some(identity) => identity.is_admin,
            None => false,
        };
        let schemas = self.resources.registry.list_schemas_for_role(is_admin);
        Ok(json!({ "tools": schemas }))
    }

    async fn handle_tools_call(
        &self,
        params: Option<&Value>,
        bearer: Option<&str>,
    ) -> AppResult<Value> {
        let params = params.ok_or_else(|| AppError::invalid_input("tools/call requires params"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::invalid_input("tools/call requires a tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let ctx = match self.resolve_identity(Some(params), bearer).await? {
            Some(identity) => {
                ExecutionContext::for_identity(&identity, Arc::clone(&self.resources.store))
            }
            None => ExecutionContext::anonymous(Arc::clone(&self.resources.store)),
        };

        self.resources.registry.execute(name, arguments, &ctx).await
    }

    /// Resolve the caller identity from the request credential.
    ///
    /// A `token` parameter takes precedence over the transport bearer;
    /// absence of both yields an anonymous invocation. A credential that is
    /// present but invalid is an error, never a silent anonymous downgrade.
    async fn resolve_identity(
        &self,
        params: Option<&Value>,
        bearer: Option<&str>,
    ) -> AppResult<Option<crate::auth::AuthResult>> {
        let param_token = params
            .and_then(|p| p.get("token"))
            .and_then(Value::as_str);
        let Some(token) = param_token.or(bearer) else {
            return Ok(None);
        };
        let identity = self.resources.validator.validate(token).await?;
        Ok(Some(identity))
    }
}
