// ABOUTME: Structured logging initialization built on tracing-subscriber
// ABOUTME: Honors RUST_LOG with a quiet default suitable for production
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Production logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to `info` for this crate and `warn` for
/// dependencies. Safe to call once per process; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,beacon_mcp_server=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
