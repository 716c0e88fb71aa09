// ABOUTME: Axum router assembly for the HTTP request/response channel
// ABOUTME: Mounts /rpc, /events, /ws, and /health over the shared resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! HTTP routes.
//!
//! The request/response channel carries the same logical protocol as the
//! line channel: one JSON-RPC request per `POST /rpc`, the bearer credential
//! in the `Authorization` header. The SSE and WebSocket routes are merged in
//! here so a single listener serves all three HTTP-borne transports.

use crate::jsonrpc::{classify, InboundFrame, JsonRpcResponse};
use crate::mcp::processor::RequestProcessor;
use crate::mcp::resources::ServerResources;
use crate::sse::SseRoutes;
use crate::websocket::WebSocketRoutes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Assemble the complete router over the shared resources
#[must_use]
pub fn router(resources: &Arc<ServerResources>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rpc", post(rpc_handler))
        .with_state(Arc::clone(resources))
        .merge(SseRoutes::routes(Arc::clone(&resources.bus)))
        .merge(WebSocketRoutes::routes(Arc::clone(
            &resources.websocket_manager,
        )))
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "beacon-mcp-server",
    }))
}

async fn rpc_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let bearer = extract_bearer(&headers);
    let processor = RequestProcessor::new(resources);

    let response = match classify(&body) {
        InboundFrame::Request(request) => processor.process(request, bearer.as_deref()).await,
        // The HTTP channel has no sampling peer; response-shaped frames and
        // malformed input both get structured errors back
        InboundFrame::Response { id, .. } => Some(JsonRpcResponse::failure(
            Some(id),
            &crate::errors::AppError::invalid_request(
                "Response frames are not accepted on the HTTP channel",
            ),
        )),
        InboundFrame::Malformed(err) => {
            Some(JsonRpcResponse::failure(body.get("id").cloned(), &err))
        }
    };

    match response {
        Some(resp) => Json(serde_json::to_value(resp).unwrap_or(Value::Null)),
        // Notification: acknowledged with an empty object
        None => Json(serde_json::json!({})),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction_requires_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok-1"),
        );
        assert_eq!(extract_bearer(&headers), Some("tok-1".to_owned()));

        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcg=="),
        );
        assert_eq!(extract_bearer(&headers), None);
    }
}
