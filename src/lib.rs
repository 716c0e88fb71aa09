// ABOUTME: Main library entry point for the Beacon tool-calling server
// ABOUTME: Exposes the registry, transports, sampling peer, and notification bus
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

#![deny(unsafe_code)]

//! # Beacon MCP Server
//!
//! A multi-transport JSON-RPC tool-calling server core. Clients reach the
//! same request processor over a line-oriented direct channel, an HTTP
//! request/response channel, a server-sent-events push channel, and a
//! bidirectional WebSocket channel.
//!
//! ## Architecture
//!
//! - **Tools**: named, capability-described operations behind one trait,
//!   dispatched through a boot-time registry
//! - **Sampling**: server-initiated requests to the client, correlated back
//!   to their callers by a per-channel peer
//! - **Notifications**: a bounded in-process broadcast bus fanned out to the
//!   push transports
//! - **Coordination**: each transport runs as an independently supervised
//!   task over one shared resource bundle
//!
//! ## Example
//!
//! ```rust,no_run
//! use beacon_mcp_server::config::ServerConfig;
//! use beacon_mcp_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Beacon configured with HTTP port {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Credential validation seam and the static token validator
pub mod auth;

/// Environment-driven server configuration
pub mod config;

/// Execution context and the record store seam
pub mod context;

/// Structured error type and JSON-RPC error codes
pub mod errors;

/// JSON-RPC 2.0 envelope types and inbound frame classification
pub mod jsonrpc;

/// Tracing subscriber setup
pub mod logging;

/// Request processor, resource bundle, and the line channel
pub mod mcp;

/// Bounded broadcast bus for server-generated events
pub mod notifications;

/// Axum router for the HTTP request/response channel
pub mod routes;

/// Server-initiated request correlation
pub mod sampling;

/// Transport coordinator
pub mod server;

/// Server-sent-events push channel
pub mod sse;

/// Tool trait, capabilities, and the boot-time registry
pub mod tools;

/// WebSocket connection manager and routes
pub mod websocket;
