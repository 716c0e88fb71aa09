// ABOUTME: Tool-calling protocol implementation shared by every transport
// ABOUTME: Houses the resource bundle, the request processor, and the line channel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Protocol server implementation.
//!
//! Transports decode wire frames into JSON-RPC requests and hand them to the
//! [`processor::RequestProcessor`], which routes them against the shared
//! [`resources::ServerResources`] bundle.

pub mod processor;
pub mod resources;
pub mod stdio;
