// ABOUTME: Tool registry with uniqueness, category discovery, and gated dispatch
// ABOUTME: Centrally enforces the admin-only capability before invoking any tool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Beacon Contributors

//! Operation registry and capability-gated dispatch.
//!
//! The registry is read-mostly: registration happens once at boot, after
//! which lookups and dispatch take shared references. Admin-only is the one
//! capability enforced here regardless of which tool author wrote the
//! handler; discovery listings never reveal admin-only tools to non-admin
//! callers.

use super::{Capabilities, Tool, ToolSchema};
use crate::context::ExecutionContext;
use crate::errors::{AppError, AppResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Registry of tools keyed by name, with category buckets for discovery
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    categories: RwLock<HashMap<String, Vec<String>>>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Returns `false` and leaves the registry untouched
    /// when the name is already taken.
    pub fn register(&self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_owned();
        let mut tools = match self.tools.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if tools.contains_key(&name) {
            warn!("Rejected duplicate tool registration: {name}");
            return false;
        }
        debug!("Registered tool: {name}");
        tools.insert(name, tool);
        true
    }

    /// Register a tool under a category bucket. The bucket is only updated
    /// when registration succeeds.
    pub fn register_with_category(&self, tool: Arc<dyn Tool>, category: &str) -> bool {
        let name = tool.name().to_owned();
        if !self.register(tool) {
            return false;
        }
        let mut categories = match self.categories.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        categories.entry(category.to_owned()).or_default().push(name);
        true
    }

    /// Look up a tool by name, returning a shared handle
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = match self.tools.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tools.get(name).cloned()
    }

    /// Dispatch an invocation with pre-flight capability checks.
    ///
    /// # Errors
    /// Returns not-found for unknown names, permission-denied when an
    /// admin-only tool is invoked from a non-admin context (without running
    /// the tool body), or whatever the tool body itself returns.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        ctx: &ExecutionContext,
    ) -> AppResult<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| AppError::not_found(format!("Unknown tool: {name}")))?;

        if tool.capabilities().contains(Capabilities::ADMIN_ONLY) && !ctx.is_admin {
            return Err(AppError::permission_denied(format!(
                "Tool {name} requires the admin role"
            )));
        }

        tool.call(args, ctx).await
    }

    /// Public schemas for discovery, filtered by the caller's role.
    ///
    /// Non-admin callers never see admin-only tools, so their existence does
    /// not leak through the listing.
    #[must_use]
    pub fn list_schemas_for_role(&self, is_admin: bool) -> Vec<ToolSchema> {
        let tools = match self.tools.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut schemas: Vec<ToolSchema> = tools
            .values()
            .filter(|tool| is_admin || !tool.capabilities().contains(Capabilities::ADMIN_ONLY))
            .map(|tool| tool.schema())
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Registered category names
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let categories = match self.categories.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut names: Vec<String> = categories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool names registered under a category
    #[must_use]
    pub fn tools_in_category(&self, category: &str) -> Vec<String> {
        let categories = match self.categories.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        categories.get(category).cloned().unwrap_or_default()
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        let tools = match self.tools.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tools.len()
    }

    /// True when no tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::InMemoryRecordStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTool {
        name: &'static str,
        caps: Capabilities,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        async fn call(&self, args: Value, _ctx: &ExecutionContext) -> AppResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(args)
        }
    }

    fn counting_tool(name: &'static str, caps: Capabilities) -> (Arc<dyn Tool>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = Arc::new(CountingTool {
            name,
            caps,
            calls: calls.clone(),
        });
        (tool, calls)
    }

    fn anon_ctx() -> ExecutionContext {
        ExecutionContext::anonymous(Arc::new(InMemoryRecordStore::new()))
    }

    fn admin_ctx() -> ExecutionContext {
        let mut ctx = anon_ctx();
        ctx.user_id = Some(uuid::Uuid::new_v4());
        ctx.is_admin = true;
        ctx
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = ToolRegistry::new();
        let (first, _) = counting_tool("echo", Capabilities::empty());
        let (second, _) = counting_tool("echo", Capabilities::ADMIN_ONLY);

        assert!(registry.register(first));
        assert!(!registry.register(second));

        // First registration remains untouched
        let kept = registry.get("echo").unwrap();
        assert_eq!(kept.capabilities(), Capabilities::empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn category_bucket_only_updated_on_success() {
        let registry = ToolRegistry::new();
        let (first, _) = counting_tool("echo", Capabilities::empty());
        let (dup, _) = counting_tool("echo", Capabilities::empty());

        assert!(registry.register_with_category(first, "demo"));
        assert!(!registry.register_with_category(dup, "demo"));

        assert_eq!(registry.tools_in_category("demo"), vec!["echo".to_owned()]);
        assert_eq!(registry.categories(), vec!["demo".to_owned()]);
    }

    #[tokio::test]
    async fn echo_round_trip_with_anonymous_context() {
        let registry = ToolRegistry::new();
        let (tool, _) = counting_tool("echo", Capabilities::empty());
        registry.register(tool);

        let result = registry
            .execute("echo", json!({"x": 1}), &anon_ctx())
            .await
            .unwrap();
        assert_eq!(result, json!({"x": 1}));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("missing", json!({}), &anon_ctx())
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn admin_only_denied_without_running_body() {
        let registry = ToolRegistry::new();
        let (tool, calls) = counting_tool("admin_ping", Capabilities::ADMIN_ONLY);
        registry.register(tool);

        let err = registry
            .execute("admin_ping", json!({}), &anon_ctx())
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::PermissionDenied);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let result = registry
            .execute("admin_ping", json!({"pong": true}), &admin_ctx())
            .await
            .unwrap();
        assert_eq!(result, json!({"pong": true}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn discovery_never_leaks_admin_tools() {
        let registry = ToolRegistry::new();
        let (echo, _) = counting_tool("echo", Capabilities::empty());
        let (admin, _) = counting_tool("admin_ping", Capabilities::ADMIN_ONLY);
        registry.register(echo);
        registry.register(admin);

        let public = registry.list_schemas_for_role(false);
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].name, "echo");

        let all = registry.list_schemas_for_role(true);
        assert_eq!(all.len(), 2);
    }
}
