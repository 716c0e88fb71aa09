// ABOUTME: Persistent bidirectional channel with auth handshake and topic fan-out
// ABOUTME: Manages the connection table, per-connection writers, and periodic stats push
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! WebSocket connection manager.
//!
//! Each connection walks the state machine
//! `Connected → Authenticating → Authenticated → Closed`. The first accepted
//! message must be an `auth` message carrying a bearer credential; validation
//! failure replies with `auth_error` and drops the connection (fail closed).
//! Once authenticated, `subscribe` messages union topic names into the
//! connection's topic set, and `publish` messages fan out to every
//! authenticated connection subscribed to the topic. Outbound delivery runs
//! through a per-connection queue drained by a dedicated writer task so
//! inbound processing never blocks on a slow socket.

use crate::auth::CredentialValidator;
use crate::notifications::{NotificationBus, ServerEvent};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Topic carrying the periodic statistics snapshots
pub const STATS_TOPIC: &str = "system:stats";

/// Lifecycle state of one persistent connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket accepted, no message processed yet
    Connected,
    /// Auth message seen, validation outstanding
    Authenticating,
    /// Caller identity resolved
    Authenticated,
    /// Being torn down
    Closed,
}

/// Client-to-server messages on the persistent channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authentication handshake carrying a bearer credential
    Auth {
        /// Bearer credential to validate
        token: String,
    },
    /// Subscribe to topics (unioned into the existing set)
    Subscribe {
        /// Topic names to add
        topics: Vec<String>,
    },
    /// Publish a data record to a topic
    Publish {
        /// Target topic
        topic: String,
        /// Record payload
        payload: Value,
    },
}

/// Server-to-client messages on the persistent channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication succeeded
    AuthOk {
        /// Resolved caller id
        user_id: Uuid,
    },
    /// Authentication failed; the connection will be dropped
    AuthError {
        /// Failure description
        message: String,
    },
    /// Acknowledges a subscribe, echoing the full topic set
    Subscribed {
        /// All topics the connection now holds
        topics: Vec<String>,
    },
    /// A record published to a subscribed topic
    Update {
        /// Topic the record was published to
        topic: String,
        /// Record payload
        payload: Value,
    },
    /// Protocol-level error
    Error {
        /// Failure description
        message: String,
    },
}

struct ClientConnection {
    state: ConnectionState,
    user_id: Option<Uuid>,
    topics: HashSet<String>,
    outbound: mpsc::UnboundedSender<String>,
}

/// Connection table and fan-out logic for the persistent channel.
///
/// The table is the actively mutated shared structure; `DashMap` gives
/// per-entry exclusive access so insert/remove/mutate are atomic with respect
/// to concurrent connections.
pub struct WebSocketManager {
    connections: DashMap<Uuid, ClientConnection>,
    validator: Arc<dyn CredentialValidator>,
    published: AtomicU64,
}

impl WebSocketManager {
    /// Create a manager validating credentials through the given collaborator
    #[must_use]
    pub fn new(validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            connections: DashMap::new(),
            validator,
            published: AtomicU64::new(0),
        }
    }

    /// Register a new connection with its outbound delivery handle.
    ///
    /// Returns the generated connection id.
    pub fn register(&self, outbound: mpsc::UnboundedSender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            ClientConnection {
                state: ConnectionState::Connected,
                user_id: None,
                topics: HashSet::new(),
                outbound,
            },
        );
        info!(connection_id = %id, "WebSocket connection registered");
        id
    }

    /// Remove a connection and stop its outbound delivery.
    pub fn disconnect(&self, id: Uuid) {
        if let Some((_, mut conn)) = self.connections.remove(&id) {
            conn.state = ConnectionState::Closed;
            info!(connection_id = %id, "WebSocket connection removed");
        }
    }

    /// Process one inbound text frame for a connection.
    ///
    /// Returns `false` when the connection must be dropped (protocol error or
    /// failed authentication).
    pub async fn handle_message(&self, id: Uuid, raw: &str) -> bool {
        let message: ClientMessage = match serde_json::from_str(raw) {
            Ok(msg) => msg,
            Err(e) => {
                self.send_to(id, &ServerMessage::Error {
                    message: format!("Malformed message: {e}"),
                });
                // Malformed input is reported, not fatal, once authenticated;
                // before authentication everything unexpected fails closed
                return self.is_authenticated(id);
            }
        };

        match message {
            ClientMessage::Auth { token } => self.handle_auth(id, &token).await,
            ClientMessage::Subscribe { topics } => self.handle_subscribe(id, topics),
            ClientMessage::Publish { topic, payload } => self.handle_publish(id, &topic, payload),
        }
    }

    async fn handle_auth(&self, id: Uuid, token: &str) -> bool {
        {
            let Some(mut conn) = self.connections.get_mut(&id) else {
                return false;
            };
            if conn.state == ConnectionState::Authenticated {
                // Idempotent re-auth is harmless; keep the existing identity
                return true;
            }
            conn.state = ConnectionState::Authenticating;
        }

        match self.validator.validate(token).await {
            Ok(identity) => {
                let Some(mut conn) = self.connections.get_mut(&id) else {
                    return false;
                };
                conn.state = ConnectionState::Authenticated;
                conn.user_id = Some(identity.user_id);
                drop(conn);
                debug!(connection_id = %id, user_id = %identity.user_id, "WebSocket authenticated");
                self.send_to(id, &ServerMessage::AuthOk {
                    user_id: identity.user_id,
                });
                true
            }
            Err(e) => {
                warn!(connection_id = %id, "WebSocket authentication failed: {e}");
                self.send_to(id, &ServerMessage::AuthError {
                    message: e.message,
                });
                false
            }
        }
    }

    fn handle_subscribe(&self, id: Uuid, topics: Vec<String>) -> bool {
        let Some(mut conn) = self.connections.get_mut(&id) else {
            return false;
        };
        if conn.state != ConnectionState::Authenticated {
            drop(conn);
            self.send_to(id, &ServerMessage::Error {
                message: "Authenticate before subscribing".to_owned(),
            });
            return false;
        }

        conn.topics.extend(topics);
        let mut all: Vec<String> = conn.topics.iter().cloned().collect();
        all.sort();
        drop(conn);
        self.send_to(id, &ServerMessage::Subscribed { topics: all });
        true
    }

    fn handle_publish(&self, id: Uuid, topic: &str, payload: Value) -> bool {
        let authorized = self
            .connections
            .get(&id)
            .is_some_and(|conn| conn.state == ConnectionState::Authenticated);
        if !authorized {
            self.send_to(id, &ServerMessage::Error {
                message: "Authenticate before publishing".to_owned(),
            });
            return false;
        }

        self.publish(topic, payload);
        true
    }

    /// Fan a record out to every authenticated connection subscribed to the
    /// topic. Returns the number of connections it was delivered to.
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let message = ServerMessage::Update {
            topic: topic.to_owned(),
            payload,
        };
        let Ok(frame) = serde_json::to_string(&message) else {
            return 0;
        };

        let mut delivered = 0;
        for conn in &self.connections {
            if conn.state == ConnectionState::Authenticated
                && conn.topics.contains(topic)
                && conn.outbound.send(frame.clone()).is_ok()
            {
                delivered += 1;
            }
        }
        debug!(topic, delivered, "Published record to topic");
        delivered
    }

    fn send_to(&self, id: Uuid, message: &ServerMessage) {
        let Some(conn) = self.connections.get(&id) else {
            return;
        };
        match serde_json::to_string(message) {
            Ok(frame) => {
                if conn.outbound.send(frame).is_err() {
                    debug!(connection_id = %id, "Outbound queue closed");
                }
            }
            Err(e) => warn!("Failed to encode server message: {e}"),
        }
    }

    fn is_authenticated(&self, id: Uuid) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|conn| conn.state == ConnectionState::Authenticated)
    }

    /// Current (total, authenticated) connection counts
    #[must_use]
    pub fn connection_counts(&self) -> (usize, usize) {
        let total = self.connections.len();
        let authenticated = self
            .connections
            .iter()
            .filter(|conn| conn.state == ConnectionState::Authenticated)
            .count();
        (total, authenticated)
    }

    /// Messages published since boot
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Snapshot current statistics as a bus event
    #[must_use]
    pub fn stats_event(&self) -> ServerEvent {
        let (connections, authenticated) = self.connection_counts();
        ServerEvent::SystemStats {
            connections,
            authenticated,
            published: self.published_count(),
            timestamp: Utc::now(),
        }
    }

    /// Spawn the periodic statistics task.
    ///
    /// Independent of any single connection: every `interval` it publishes a
    /// snapshot to the [`STATS_TOPIC`] subscribers and onto the notification
    /// bus. The task runs until the manager is dropped by the process.
    pub fn spawn_stats_task(
        self: &Arc<Self>,
        interval: Duration,
        bus: Arc<NotificationBus>,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick fires immediately; skip it so the first snapshot
            // lands one full interval after boot
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let event = manager.stats_event();
                if let Ok(payload) = serde_json::to_value(&event) {
                    manager.publish(STATS_TOPIC, payload);
                }
                bus.publish(event);
            }
        })
    }
}

/// Axum route bundle mounting the manager at `GET /ws`
pub struct WebSocketRoutes;

impl WebSocketRoutes {
    /// Router exposing the WebSocket upgrade endpoint
    pub fn routes(manager: Arc<WebSocketManager>) -> Router {
        Router::new()
            .route("/ws", get(upgrade_handler))
            .with_state(manager)
    }
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(manager): State<Arc<WebSocketManager>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_connection(socket, manager))
}

/// Drive one accepted socket: register it, run the writer task, and feed
/// inbound frames through the manager until disconnect.
async fn serve_connection(socket: WebSocket, manager: Arc<WebSocketManager>) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let connection_id = manager.register(outbound_tx);

    // Dedicated writer so inbound processing and outbound writes never block
    // each other
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if !manager.handle_message(connection_id, &text).await {
                    break;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {} // ping/pong/binary ignored
        }
    }

    // Removing the connection drops the last outbound sender; the writer
    // then drains any queued frames (the auth_error acknowledgment on a
    // failed handshake) before it ends
    manager.disconnect(connection_id);
    let _ = tokio::time::timeout(Duration::from_secs(5), writer).await;
}
