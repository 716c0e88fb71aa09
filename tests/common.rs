// ABOUTME: Shared test utilities for the integration suites
// ABOUTME: Builds resource bundles and serves the router on an ephemeral port
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `beacon_mcp_server`
//!
//! Common setup to reduce duplication across the integration suites.

use beacon_mcp_server::auth::StaticTokenValidator;
use beacon_mcp_server::config::ServerConfig;
use beacon_mcp_server::context::InMemoryRecordStore;
use beacon_mcp_server::mcp::resources::ServerResources;
use beacon_mcp_server::routes;
use beacon_mcp_server::tools::builtin::{AdminPingTool, EchoTool, GetRecordTool, PutRecordTool};
use beacon_mcp_server::tools::registry::ToolRegistry;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .with_test_writer()
            .try_init();
    });
}

/// Known tokens registered in every test validator
pub const USER_TOKEN: &str = "test-user-token";
pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestIdentities {
    pub user_id: Uuid,
    pub admin_id: Uuid,
}

/// Build a resource bundle with the built-in tools and two known tokens
pub fn test_resources() -> (Arc<ServerResources>, TestIdentities) {
    init_test_logging();

    let registry = Arc::new(ToolRegistry::new());
    registry.register_with_category(Arc::new(EchoTool), "diagnostics");
    registry.register_with_category(Arc::new(AdminPingTool), "diagnostics");
    registry.register_with_category(Arc::new(GetRecordTool), "records");
    registry.register_with_category(Arc::new(PutRecordTool), "records");

    let validator = StaticTokenValidator::new();
    let user_id = validator.insert_user(USER_TOKEN);
    let admin_id = validator.insert_admin(ADMIN_TOKEN);

    let resources = Arc::new(ServerResources::new(
        ServerConfig::default(),
        registry,
        Arc::new(validator),
        Arc::new(InMemoryRecordStore::new()),
    ));
    (resources, TestIdentities { user_id, admin_id })
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub resources: Arc<ServerResources>,
    pub identities: TestIdentities,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve the full router on an ephemeral port
pub async fn spawn_test_server() -> TestServer {
    let (resources, identities) = test_resources();
    let app = routes::router(&resources);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no local addr");

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        addr,
        resources,
        identities,
        handle,
    }
}
