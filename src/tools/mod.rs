// ABOUTME: Tool abstraction with capability flags and public schemas
// ABOUTME: Defines the Tool trait, Capabilities bitflags, and ToolSchema DTO
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Unified tool execution abstraction.
//!
//! A tool is a named, independently invokable unit of server functionality
//! with a declared parameter schema and a capability descriptor. Tools are
//! registered once at boot into the [`registry::ToolRegistry`] and invoked
//! through a uniform async signature; no inheritance hierarchy, just one
//! trait and a lookup table keyed by name.

pub mod builtin;
pub mod registry;

use crate::context::ExecutionContext;
use crate::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

bitflags::bitflags! {
    /// Access-control descriptor attached to each tool.
    ///
    /// The flags double as machine-checkable documentation. Only
    /// [`Capabilities::ADMIN_ONLY`] is centrally enforced by the registry;
    /// the remaining flags are asserted by the tool body against the
    /// execution context, because the precise failure message and recovery
    /// path differ per tool. That asymmetry is intentional.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        /// Requires an authenticated caller
        const REQUIRES_AUTH = 1 << 0;
        /// Requires a tenant scope on the context
        const REQUIRES_TENANT = 1 << 1;
        /// Requires a connected external account
        const REQUIRES_PROVIDER = 1 << 2;
        /// Reads domain records
        const READS_DATA = 1 << 3;
        /// Mutates domain records
        const WRITES_DATA = 1 << 4;
        /// Restricted to admin callers; enforced by the registry
        const ADMIN_ONLY = 1 << 5;
    }
}

/// Public description of a tool for discovery listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name, unique across the registry
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema of the accepted parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A named, registrable server operation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name
    fn name(&self) -> &str;

    /// Human-readable description for discovery
    fn description(&self) -> &str;

    /// JSON schema of the accepted parameters
    fn input_schema(&self) -> Value;

    /// Capability descriptor for this tool
    fn capabilities(&self) -> Capabilities;

    /// Invoke the tool with the given arguments and ambient context.
    ///
    /// # Errors
    /// Returns a structured error which the transport converts into an error
    /// response on the originating channel.
    async fn call(&self, args: Value, ctx: &ExecutionContext) -> AppResult<Value>;

    /// Public schema derived from the identity accessors
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            input_schema: self.input_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_combine_by_union() {
        let caps = Capabilities::REQUIRES_AUTH | Capabilities::WRITES_DATA;
        assert!(caps.contains(Capabilities::REQUIRES_AUTH));
        assert!(caps.contains(Capabilities::WRITES_DATA));
        assert!(!caps.contains(Capabilities::ADMIN_ONLY));
    }
}
