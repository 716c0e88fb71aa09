// ABOUTME: Credential validation seam between transports and the identity provider
// ABOUTME: Defines AuthResult, the CredentialValidator trait, and an in-memory validator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Authentication collaborator interface.
//!
//! The core does not implement credential cryptography. Transports hand a
//! bearer credential to a [`CredentialValidator`] and receive a resolved
//! [`AuthResult`] identity, which the request processor turns into an
//! execution context. The [`StaticTokenValidator`] is the in-memory
//! implementation used by the binary's bootstrap token and by tests.

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

/// Resolved caller identity after successful credential validation
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// Caller id
    pub user_id: Uuid,
    /// Tenant the caller operates in, when tenancy applies
    pub tenant_id: Option<Uuid>,
    /// Whether the caller holds the admin role
    pub is_admin: bool,
}

/// Narrow interface consumed from the external authentication collaborator:
/// validate a bearer credential and obtain an identity.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    /// Validate a bearer credential.
    ///
    /// # Errors
    /// Returns [`AppError::auth_invalid`] when the credential is unknown,
    /// expired, or otherwise unacceptable.
    async fn validate(&self, token: &str) -> AppResult<AuthResult>;
}

/// Token-table validator backed by an in-memory map.
///
/// Used for bootstrap tokens and tests; production deployments plug in a
/// validator backed by their identity provider.
#[derive(Default)]
pub struct StaticTokenValidator {
    tokens: DashMap<String, AuthResult>,
}

impl StaticTokenValidator {
    /// Create an empty validator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token mapping to the given identity
    pub fn insert(&self, token: impl Into<String>, identity: AuthResult) {
        self.tokens.insert(token.into(), identity);
    }

    /// Convenience: register a token for a fresh non-admin user
    pub fn insert_user(&self, token: impl Into<String>) -> Uuid {
        let user_id = Uuid::new_v4();
        self.insert(
            token,
            AuthResult {
                user_id,
                tenant_id: None,
                is_admin: false,
            },
        );
        user_id
    }

    /// Convenience: register a token for a fresh admin user
    pub fn insert_admin(&self, token: impl Into<String>) -> Uuid {
        let user_id = Uuid::new_v4();
        self.insert(
            token,
            AuthResult {
                user_id,
                tenant_id: None,
                is_admin: true,
            },
        );
        user_id
    }
}

#[async_trait]
impl CredentialValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> AppResult<AuthResult> {
        self.tokens
            .get(token)
            .map(|entry| entry.clone())
            .ok_or_else(|| AppError::auth_invalid("Invalid or unknown bearer credential"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn validates_known_token() {
        let validator = StaticTokenValidator::new();
        let user_id = validator.insert_user("tok-abc");

        let identity = validator.validate("tok-abc").await.unwrap();
        assert_eq!(identity.user_id, user_id);
        assert!(!identity.is_admin);
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        let validator = StaticTokenValidator::new();
        let err = validator.validate("nope").await.unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::Unauthorized);
    }
}
