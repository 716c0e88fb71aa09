// ABOUTME: Dependency-injection bundle of shared server resources
// ABOUTME: Constructed once at boot and passed by Arc into every transport
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Shared server resources.
//!
//! Constructed once at startup and handed by `Arc` to every transport, so
//! construction order and lifetime stay explicit and testable. Transports
//! share state only through this bundle, never through transport-specific
//! mutable state, so a failure in one transport cannot corrupt another's
//! view.

use crate::auth::CredentialValidator;
use crate::config::ServerConfig;
use crate::context::RecordStore;
use crate::notifications::NotificationBus;
use crate::tools::registry::ToolRegistry;
use crate::websocket::WebSocketManager;
use std::sync::Arc;

/// Everything the transports share
pub struct ServerResources {
    /// Runtime configuration
    pub config: ServerConfig,
    /// Tool registry, read-mostly after boot
    pub registry: Arc<ToolRegistry>,
    /// Server-originated event bus
    pub bus: Arc<NotificationBus>,
    /// Persistent bidirectional channel manager
    pub websocket_manager: Arc<WebSocketManager>,
    /// Credential validation collaborator
    pub validator: Arc<dyn CredentialValidator>,
    /// Domain record storage collaborator
    pub store: Arc<dyn RecordStore>,
}

impl ServerResources {
    /// Assemble the bundle from its parts
    #[must_use]
    pub fn new(
        config: ServerConfig,
        registry: Arc<ToolRegistry>,
        validator: Arc<dyn CredentialValidator>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let bus = Arc::new(NotificationBus::new(config.notification_bus_capacity));
        let websocket_manager = Arc::new(WebSocketManager::new(Arc::clone(&validator)));
        Self {
            config,
            registry,
            bus,
            websocket_manager,
            validator,
            store,
        }
    }
}
