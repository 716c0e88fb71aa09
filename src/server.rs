// ABOUTME: Transport coordinator supervising every channel as an independent task
// ABOUTME: Restarts the HTTP listener with backoff and runs the periodic stats task
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Transport coordination.
//!
//! The coordinator owns the shared resources and starts each transport as an
//! independently supervised unit of concurrency. The HTTP channel runs in a
//! restart loop that never gives up on its own: a clean exit restarts after
//! the short backoff, an error exit after the longer one, and only an
//! explicit shutdown signal stops it. A failure in one transport is isolated
//! to that transport; shared state lives only in the resource bundle.

use crate::errors::{AppError, AppResult};
use crate::mcp::resources::ServerResources;
use crate::mcp::stdio::LineChannel;
use crate::routes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Supervises every transport over one shared resource bundle
#[derive(Clone)]
pub struct TransportCoordinator {
    resources: Arc<ServerResources>,
}

impl TransportCoordinator {
    /// Create a coordinator over pre-built resources
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Shared reference to the resource bundle
    #[must_use]
    pub fn resources(&self) -> Arc<ServerResources> {
        Arc::clone(&self.resources)
    }

    /// Run all transports until the shutdown signal fires.
    ///
    /// # Errors
    /// Returns an error only for unrecoverable setup failures; channel-level
    /// failures are absorbed by the restart/removal policies.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
        // Periodic statistics, independent of any single connection
        let stats_task = self.resources.websocket_manager.spawn_stats_task(
            self.resources.config.stats_interval,
            Arc::clone(&self.resources.bus),
        );

        // Line channel over process stdio, when enabled
        let stdio_task = self.resources.config.stdio_enabled.then(|| {
            let resources = Arc::clone(&self.resources);
            tokio::spawn(async move {
                let channel = LineChannel::new(resources);
                if let Err(e) = channel.run(tokio::io::stdin(), tokio::io::stdout()).await {
                    error!("Line channel terminated: {e}");
                }
            })
        });

        // HTTP channel (also carries SSE and WebSocket) in its restart loop
        let http = self.http_restart_loop(shutdown.clone());
        tokio::pin!(http);

        let result = tokio::select! {
            result = &mut http => result,
            _ = shutdown.changed() => Ok(()),
        };

        stats_task.abort();
        if let Some(task) = stdio_task {
            task.abort();
        }
        result
    }

    /// Restart loop for the HTTP listener.
    ///
    /// Clean termination waits the short backoff before restarting; error
    /// termination waits the longer one. The loop never gives up permanently.
    async fn http_restart_loop(&self, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
        loop {
            let backoff = match self.serve_http(shutdown.clone()).await {
                Ok(()) => {
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                    info!(
                        "HTTP channel exited cleanly; restarting in {:?}",
                        self.resources.config.restart_backoff_clean
                    );
                    self.resources.config.restart_backoff_clean
                }
                Err(e) => {
                    warn!(
                        "HTTP channel failed: {e}; restarting in {:?}",
                        self.resources.config.restart_backoff_error
                    );
                    self.resources.config.restart_backoff_error
                }
            };

            tokio::select! {
                () = tokio::time::sleep(backoff) => {}
                _ = shutdown.changed() => return Ok(()),
            }
        }
    }

    /// Bind and serve the HTTP listener once, until failure or shutdown.
    async fn serve_http(&self, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.resources.config.host, self.resources.config.http_port
        )
        .parse()
        .map_err(|e| AppError::transport(format!("Invalid bind address: {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::transport(format!("Failed to bind {addr}: {e}")))?;
        info!("HTTP channel listening on http://{addr}");

        let app = routes::router(&self.resources);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| AppError::transport(format!("HTTP channel error: {e}")))
    }
}
