// ABOUTME: Single-producer multi-consumer event bus for server-originated events
// ABOUTME: Bounded broadcast channel where slow subscribers lag instead of blocking producers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Notification bus.
//!
//! Server-originated events (a completed external authorization flow, the
//! periodic statistics snapshot) flow into one bounded broadcast channel;
//! every subscribed transport forwards them onward in its own wire format.
//! The channel is bounded and lossy for laggards: a slow or absent consumer
//! misses events rather than blocking producers. Per-subscriber delivery of
//! what a subscriber does receive is FIFO; nothing more is promised.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Immutable tagged event payload distributed over the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// An external authorization flow completed for a caller
    OauthFlowCompleted {
        /// Provider the flow was run against
        provider: String,
        /// Whether the flow succeeded
        success: bool,
        /// Subject the flow belongs to
        user_id: Uuid,
    },
    /// Periodic system-wide statistics snapshot
    SystemStats {
        /// Live connections on the persistent channel
        connections: usize,
        /// Connections past the authentication handshake
        authenticated: usize,
        /// Messages published since boot
        published: u64,
        /// When the snapshot was taken
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// Notification method name used when forwarding over JSON-RPC channels
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::OauthFlowCompleted { .. } => "notifications/oauth_completed",
            Self::SystemStats { .. } => "notifications/system_stats",
        }
    }
}

/// Bounded broadcast bus for [`ServerEvent`]s
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl NotificationBus {
    /// Create a bus with the given capacity (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to every live subscriber.
    ///
    /// Never blocks. Returns the number of subscribers that will observe the
    /// event; zero subscribers is not an error.
    pub fn publish(&self, event: ServerEvent) -> usize {
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(receivers, "Published server event");
        receivers
    }

    /// Subscribe to events published after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Current subscriber count
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(128)
    }
}
