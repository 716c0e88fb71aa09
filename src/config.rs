// ABOUTME: Environment-only server configuration with test-friendly defaults
// ABOUTME: Collects ports, backoffs, intervals, and channel capacities in one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Server configuration loaded from the environment.
//!
//! Configuration is environment-only: every knob has a default that works in
//! tests with no environment at all, and each can be overridden through a
//! `BEACON_*` variable.

use crate::errors::{AppError, AppResult};
use std::env;
use std::time::Duration;

/// Runtime configuration for the server core
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host for the HTTP listener
    pub host: String,
    /// Bind port for the HTTP listener
    pub http_port: u16,
    /// Backoff before restarting the HTTP channel after a clean exit
    pub restart_backoff_clean: Duration,
    /// Backoff before restarting the HTTP channel after an error exit
    pub restart_backoff_error: Duration,
    /// Interval between system statistics broadcasts
    pub stats_interval: Duration,
    /// Capacity of the notification bus (lagging subscribers miss events)
    pub notification_bus_capacity: usize,
    /// Default deadline for server-issued sampling requests
    pub sampling_timeout: Duration,
    /// Whether to run the stdio line transport
    pub stdio_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            http_port: 8081,
            restart_backoff_clean: Duration::from_secs(5),
            restart_backoff_error: Duration::from_secs(10),
            stats_interval: Duration::from_secs(30),
            notification_bus_capacity: 128,
            sampling_timeout: Duration::from_secs(30),
            stdio_enabled: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `BEACON_*` environment variables.
    ///
    /// # Errors
    /// Returns an error when a variable is present but cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("BEACON_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var::<u16>("BEACON_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(secs) = parse_var::<u64>("BEACON_RESTART_BACKOFF_CLEAN_SECS")? {
            config.restart_backoff_clean = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("BEACON_RESTART_BACKOFF_ERROR_SECS")? {
            config.restart_backoff_error = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("BEACON_STATS_INTERVAL_SECS")? {
            config.stats_interval = Duration::from_secs(secs);
        }
        if let Some(capacity) = parse_var::<usize>("BEACON_BUS_CAPACITY")? {
            config.notification_bus_capacity = capacity.max(1);
        }
        if let Some(secs) = parse_var::<u64>("BEACON_SAMPLING_TIMEOUT_SECS")? {
            config.sampling_timeout = Duration::from_secs(secs);
        }
        if let Ok(value) = env::var("BEACON_STDIO") {
            config.stdio_enabled = matches!(value.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> AppResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::invalid_input(format!("Invalid value for {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}
