// ABOUTME: Request/response correlator for server-issued requests over a channel
// ABOUTME: Matches inbound responses to pending entries by id with single fulfillment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Sampling peer: server-initiated request/response correlation.
//!
//! The server side of a persistent or line-oriented channel can ask the
//! remote party to perform a computation. [`SamplingPeer::issue`] allocates a
//! fresh id, writes a request frame onto the channel's outbound sender, and
//! awaits a matched response routed back through
//! [`SamplingPeer::handle_response`]. Every pending entry reaches at most one
//! terminal state: fulfilled, timed out, or cancelled at channel teardown.

use crate::errors::{AppError, AppResult};
use crate::jsonrpc::{JsonRpcError, JsonRpcRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

type PendingSlot = oneshot::Sender<AppResult<Value>>;

/// Correlator for server-issued requests on one channel.
///
/// The pending table is the one actively mutated shared structure here and is
/// guarded by a mutex so insert/remove/fulfill are atomic with respect to
/// concurrent callers.
pub struct SamplingPeer {
    outbound: mpsc::UnboundedSender<String>,
    pending: Arc<Mutex<HashMap<u64, PendingSlot>>>,
    next_id: AtomicU64,
    default_timeout: Duration,
}

impl SamplingPeer {
    /// Create a peer writing outbound frames to the given sender.
    ///
    /// The sender carries serialized JSON lines; the owning transport drains
    /// it onto the wire. `default_timeout` is the deadline applied by
    /// [`SamplingPeer::issue_default`].
    #[must_use]
    pub fn new(outbound: mpsc::UnboundedSender<String>, default_timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            default_timeout,
        }
    }

    /// [`SamplingPeer::issue`] with the configured default deadline.
    ///
    /// # Errors
    /// Same failure modes as [`SamplingPeer::issue`].
    pub async fn issue_default(&self, method: &str, params: Value) -> AppResult<Value> {
        self.issue(method, params, self.default_timeout).await
    }

    /// Issue a request to the remote party and await the matched response.
    ///
    /// # Errors
    /// Returns a timeout error when no response arrives within `timeout` (the
    /// entry is removed), a connection-closed error when the channel is torn
    /// down first, or the remote party's error payload.
    pub async fn issue(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> AppResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        let request = JsonRpcRequest::new(Value::from(id), method, Some(params));
        let frame = serde_json::to_string(&request)
            .map_err(|e| AppError::internal(format!("Failed to encode sampling request: {e}")))?;

        if self.outbound.send(frame).is_err() {
            let mut pending = self.pending.lock().await;
            pending.remove(&id);
            return Err(AppError::connection_closed(
                "Channel closed before sampling request could be written",
            ));
        }

        debug!(id, method, "Issued sampling request");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            // Sender dropped without fulfilling; cancel_all_pending sends an
            // explicit error first, so this only happens on internal teardown
            Ok(Err(_)) => Err(AppError::connection_closed(
                "Sampling channel dropped without a response",
            )),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                Err(AppError::timeout(format!(
                    "Sampling request {id} got no response within {timeout:?}"
                )))
            }
        }
    }

    /// Route an inbound response to its pending entry.
    ///
    /// Returns `true` when a pending entry was fulfilled. Unknown ids
    /// (expired, already fulfilled, or never issued) return `false`; callers
    /// log a warning rather than treating that as fatal.
    pub async fn handle_response(
        &self,
        id: &Value,
        result: Option<Value>,
        error: Option<JsonRpcError>,
    ) -> bool {
        let Some(numeric_id) = id.as_u64() else {
            warn!(?id, "Sampling response id is not numeric");
            return false;
        };

        let slot = {
            let mut pending = self.pending.lock().await;
            pending.remove(&numeric_id)
        };

        let Some(slot) = slot else {
            warn!(id = numeric_id, "Unmatched sampling response");
            return false;
        };

        let outcome = match (result, error) {
            (_, Some(err)) => Err(AppError::internal(format!(
                "Remote error {}: {}",
                err.code, err.message
            ))),
            (Some(value), None) => Ok(value),
            (None, None) => Ok(Value::Null),
        };

        // Receiver may have gone away between removal and send; the entry is
        // terminal either way
        let _ = slot.send(outcome);
        true
    }

    /// Resolve every outstanding entry with a connection-closed failure.
    ///
    /// Called when the owning channel terminates so no caller of
    /// [`SamplingPeer::issue`] blocks past teardown.
    pub async fn cancel_all_pending(&self) {
        let entries: Vec<(u64, PendingSlot)> = {
            let mut pending = self.pending.lock().await;
            pending.drain().collect()
        };

        let count = entries.len();
        for (id, slot) in entries {
            let _ = slot.send(Err(AppError::connection_closed(format!(
                "Channel closed with sampling request {id} outstanding"
            ))));
        }

        if count > 0 {
            debug!(count, "Cancelled outstanding sampling requests");
        }
    }

    /// Number of outstanding entries
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
