// ABOUTME: Small built-in tool set exercising the registry and collaborator seams
// ABOUTME: Provides echo, admin_ping, and tenant-scoped record get/put tools
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Built-in tools.
//!
//! The business-tool catalog lives outside this crate; these are the minimal
//! operations the server binary registers so a fresh deployment is probeable
//! end to end, and they double as reference implementations of the
//! capability conventions: `admin_ping` relies on the registry's central
//! admin gate, while the record tools assert their own auth/tenant
//! requirements against the execution context.

use super::{Capabilities, Tool};
use crate::context::ExecutionContext;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Returns its arguments unchanged; no capabilities required
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the given arguments unchanged"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "additionalProperties": true
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    async fn call(&self, args: Value, _ctx: &ExecutionContext) -> AppResult<Value> {
        Ok(args)
    }
}

/// Admin-only liveness probe; the registry enforces the gate
pub struct AdminPingTool;

#[async_trait]
impl Tool for AdminPingTool {
    fn name(&self) -> &str {
        "admin_ping"
    }

    fn description(&self) -> &str {
        "Admin-only liveness probe"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ADMIN_ONLY
    }

    async fn call(&self, _args: Value, ctx: &ExecutionContext) -> AppResult<Value> {
        Ok(json!({
            "pong": true,
            "user_id": ctx.user_id,
        }))
    }
}

/// Fetch a domain record by id within the caller's tenant scope.
///
/// Asserts its own auth requirement against the context; the registry only
/// enforces admin-only centrally.
pub struct GetRecordTool;

#[async_trait]
impl Tool for GetRecordTool {
    fn name(&self) -> &str {
        "get_record"
    }

    fn description(&self) -> &str {
        "Fetch a domain record by id, scoped to the caller's tenant"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "record_id": {"type": "string"}
            },
            "required": ["record_id"]
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REQUIRES_AUTH | Capabilities::READS_DATA
    }

    async fn call(&self, args: Value, ctx: &ExecutionContext) -> AppResult<Value> {
        ctx.require_user()?;
        let record_id = args
            .get("record_id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::invalid_input("record_id is required"))?;

        let record = ctx.store.fetch(ctx.tenant_id, record_id).await?;
        record.map_or_else(
            || Err(AppError::not_found(format!("Record not found: {record_id}"))),
            Ok,
        )
    }
}

/// Insert or replace a domain record within the caller's tenant scope
pub struct PutRecordTool;

#[async_trait]
impl Tool for PutRecordTool {
    fn name(&self) -> &str {
        "put_record"
    }

    fn description(&self) -> &str {
        "Insert or replace a domain record, scoped to the caller's tenant"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "record_id": {"type": "string"},
                "record": {"type": "object"}
            },
            "required": ["record_id", "record"]
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REQUIRES_AUTH | Capabilities::WRITES_DATA
    }

    async fn call(&self, args: Value, ctx: &ExecutionContext) -> AppResult<Value> {
        ctx.require_user()?;
        let record_id = args
            .get("record_id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::invalid_input("record_id is required"))?;
        let record = args
            .get("record")
            .cloned()
            .ok_or_else(|| AppError::invalid_input("record is required"))?;

        ctx.store.put(ctx.tenant_id, record_id, record).await?;
        Ok(json!({"saved": record_id}))
    }
}
