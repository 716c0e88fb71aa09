// ABOUTME: Per-invocation execution context and the domain-record storage seam
// ABOUTME: Defines ExecutionContext, the RecordStore trait, and an in-memory store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Execution context passed into every tool invocation.
//!
//! The context is built fresh per request by the transport layer from the
//! validated credential and is never mutated afterwards. It bundles the
//! caller identity with handles to the external collaborators a tool body may
//! need: a [`RecordStore`] for domain records and a connected-accounts map.

use crate::auth::AuthResult;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Narrow interface consumed from the external storage collaborator:
/// fetch/mutate a domain record by id, scoped to a tenant.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by id within a tenant scope.
    ///
    /// # Errors
    /// Returns an error on storage failure; `Ok(None)` when absent.
    async fn fetch(&self, tenant_id: Option<Uuid>, record_id: &str) -> AppResult<Option<Value>>;

    /// Insert or replace a record by id within a tenant scope.
    ///
    /// # Errors
    /// Returns an error on storage failure.
    async fn put(&self, tenant_id: Option<Uuid>, record_id: &str, record: Value) -> AppResult<()>;
}

/// In-memory record store for tests and single-process deployments
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<(Option<Uuid>, String), Value>>,
}

impl InMemoryRecordStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch(&self, tenant_id: Option<Uuid>, record_id: &str) -> AppResult<Option<Value>> {
        let records = self.records.read().await;
        Ok(records.get(&(tenant_id, record_id.to_owned())).cloned())
    }

    async fn put(&self, tenant_id: Option<Uuid>, record_id: &str, record: Value) -> AppResult<()> {
        let mut records = self.records.write().await;
        records.insert((tenant_id, record_id.to_owned()), record);
        Ok(())
    }
}

/// Ambient data for one tool invocation.
///
/// Caller identity is optional: an absent `user_id` means the invocation is
/// anonymous and tools requiring authentication must reject it themselves
/// (the registry only enforces the admin-only flag centrally).
#[derive(Clone)]
pub struct ExecutionContext {
    /// Caller id; `None` for anonymous invocations
    pub user_id: Option<Uuid>,
    /// Tenant scope, when tenancy applies
    pub tenant_id: Option<Uuid>,
    /// Whether the caller holds the admin role
    pub is_admin: bool,
    /// Domain record storage collaborator
    pub store: Arc<dyn RecordStore>,
    /// Connected external accounts, keyed by provider name
    pub connected_accounts: HashMap<String, bool>,
}

impl ExecutionContext {
    /// Build an anonymous context over the given store
    #[must_use]
    pub fn anonymous(store: Arc<dyn RecordStore>) -> Self {
        Self {
            user_id: None,
            tenant_id: None,
            is_admin: false,
            store,
            connected_accounts: HashMap::new(),
        }
    }

    /// Build a context from a validated identity
    #[must_use]
    pub fn for_identity(identity: &AuthResult, store: Arc<dyn RecordStore>) -> Self {
        Self {
            user_id: Some(identity.user_id),
            tenant_id: identity.tenant_id,
            is_admin: identity.is_admin,
            store,
            connected_accounts: HashMap::new(),
        }
    }

    /// Caller id, or an error for tools that require authentication.
    ///
    /// # Errors
    /// Returns [`AppError::auth_invalid`] for anonymous contexts.
    pub fn require_user(&self) -> AppResult<Uuid> {
        self.user_id
            .ok_or_else(|| AppError::auth_invalid("This tool requires an authenticated caller"))
    }

    /// Tenant id, or an error for tools that require tenant scope.
    ///
    /// # Errors
    /// Returns [`AppError::invalid_input`] when no tenant scope is present.
    pub fn require_tenant(&self) -> AppResult<Uuid> {
        self.tenant_id
            .ok_or_else(|| AppError::invalid_input("This tool requires a tenant scope"))
    }
}
