// ABOUTME: Server-push notification channel emitting bus events as SSE text blocks
// ABOUTME: Each event is a fixed marker line, the JSON payload, and a blank line
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Server-Sent Events push channel.
//!
//! Subscribes to the notification bus and forwards every event to connected
//! clients as a `data: <json>` block followed by a blank line. A client
//! stream ends only when the bus itself is closed; a lagging client skips the
//! missed events and keeps receiving.

use crate::notifications::NotificationBus;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// SSE route bundle over the notification bus
pub struct SseRoutes;

impl SseRoutes {
    /// Router exposing `GET /events`
    pub fn routes(bus: Arc<NotificationBus>) -> Router {
        Router::new()
            .route("/events", get(events_handler))
            .with_state(bus)
    }
}

async fn events_handler(
    State(bus): State<Arc<NotificationBus>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("SSE client subscribed to notification bus");

    let stream = BroadcastStream::new(bus.subscribe()).filter_map(|item| async move {
        match item {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => Some(Ok(Event::default().event(event.method()).data(payload))),
                Err(e) => {
                    warn!("Failed to encode server event for SSE: {e}");
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                // Backpressure policy: laggards skip, producers never block
                warn!(missed, "SSE client lagged behind the notification bus");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
