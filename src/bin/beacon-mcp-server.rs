// ABOUTME: Server binary wiring configuration, resources, and the coordinator
// ABOUTME: Registers the built-in tools and runs all transports until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! # Beacon MCP Server
//!
//! Multi-transport JSON-RPC tool-calling server. Serves the HTTP, SSE, and
//! WebSocket channels on one listener and, with `--stdio`, the line channel
//! over process stdin/stdout.
//!
//! ## Usage
//!
//! ```bash
//! # Serve HTTP/SSE/WebSocket on the configured port
//! cargo run --bin beacon-mcp-server
//!
//! # Override the HTTP port
//! cargo run --bin beacon-mcp-server -- --http-port 9090
//!
//! # Also run the line channel over stdio
//! cargo run --bin beacon-mcp-server -- --stdio
//! ```

use anyhow::Result;
use beacon_mcp_server::auth::StaticTokenValidator;
use beacon_mcp_server::config::ServerConfig;
use beacon_mcp_server::context::InMemoryRecordStore;
use beacon_mcp_server::logging;
use beacon_mcp_server::mcp::resources::ServerResources;
use beacon_mcp_server::server::TransportCoordinator;
use beacon_mcp_server::tools::builtin::{AdminPingTool, EchoTool, GetRecordTool, PutRecordTool};
use beacon_mcp_server::tools::registry::ToolRegistry;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "beacon-mcp-server", about = "Multi-transport tool-calling server")]
struct Args {
    /// HTTP port override (default from BEACON_HTTP_PORT or 8081)
    #[arg(long)]
    http_port: Option<u16>,

    /// Bind host override
    #[arg(long)]
    host: Option<String>,

    /// Also run the line channel over process stdin/stdout
    #[arg(long)]
    stdio: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if args.stdio {
        config.stdio_enabled = true;
    }

    let registry = Arc::new(ToolRegistry::new());
    register_builtin_tools(&registry);
    info!("Registered {} tools", registry.len());

    let resources = Arc::new(ServerResources::new(
        config,
        registry,
        Arc::new(StaticTokenValidator::new()),
        Arc::new(InMemoryRecordStore::new()),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let coordinator = TransportCoordinator::new(resources);
    coordinator.run(shutdown_rx).await?;
    Ok(())
}

fn register_builtin_tools(registry: &ToolRegistry) {
    for (tool, category) in [
        (Arc::new(EchoTool) as Arc<dyn beacon_mcp_server::tools::Tool>, "diagnostics"),
        (Arc::new(AdminPingTool), "diagnostics"),
        (Arc::new(GetRecordTool), "records"),
        (Arc::new(PutRecordTool), "records"),
    ] {
        let name = tool.name().to_owned();
        if !registry.register_with_category(tool, category) {
            warn!("Duplicate tool registration ignored: {name}");
        }
    }
}
