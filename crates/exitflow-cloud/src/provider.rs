//! Control-plane provider trait
//!
//! The boundary between the reconciliation engine and a concrete cloud SDK.
//! Lookups return `Ok(None)` for "not found" — implementations are expected
//! to translate the provider's not-found errors into absence and surface
//! everything else verbatim, wrapped with the operation name. Create
//! operations are unconditional: the orchestrator only invokes them for
//! resources discovery proved absent, and an "already exists" conflict from
//! the provider fails naturally.

use crate::error::Result;
use crate::state::Resource;
use async_trait::async_trait;
use std::collections::HashMap;

/// An inline role policy as discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePolicy {
    pub name: String,
    pub document: String,
}

/// Everything needed to create the control function.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub role_arn: String,
    /// Deployment archive (zip with a `bootstrap` entry point).
    pub archive: Vec<u8>,
    pub environment: HashMap<String, String>,
}

/// Cloud provider abstraction for the control plane.
///
/// One method per discovery lookup, create operation and delete operation;
/// each takes exactly the inputs it needs (fixed name plus any
/// cross-resource reference such as the role ARN).
#[async_trait]
pub trait ControlPlaneProvider: Send + Sync {
    // --- discovery ---

    async fn get_role(&self, name: &str) -> Result<Option<Resource>>;

    /// ARNs of every managed policy attached to the role.
    async fn list_attached_policy_arns(&self, role_name: &str) -> Result<Vec<String>>;

    async fn get_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> Result<Option<InlinePolicy>>;

    async fn get_function(&self, name: &str) -> Result<Option<Resource>>;

    async fn get_function_url(&self, function_name: &str) -> Result<Option<String>>;

    /// Exact-name log group lookup (implementations query by prefix and
    /// must require an exact match).
    async fn find_log_group(&self, name: &str) -> Result<Option<Resource>>;

    // --- creation ---

    async fn create_log_group(&self, name: &str, retention_days: i32) -> Result<()>;

    /// Returns the new role's ARN.
    async fn create_role(&self, name: &str, assume_role_policy: &str) -> Result<String>;

    async fn attach_managed_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;

    async fn put_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        document: &str,
    ) -> Result<()>;

    /// Returns the new function's ARN.
    async fn create_function(&self, spec: &FunctionSpec) -> Result<String>;

    /// Returns the public URL.
    async fn create_function_url(&self, function_name: &str) -> Result<String>;

    /// Grants public invocation on the function URL. Without this the URL
    /// exists but every request is rejected.
    async fn allow_public_invoke(&self, function_name: &str) -> Result<()>;

    // --- deletion ---

    async fn delete_function_url(&self, function_name: &str) -> Result<()>;

    async fn delete_function(&self, name: &str) -> Result<()>;

    async fn delete_inline_policy(&self, role_name: &str, policy_name: &str) -> Result<()>;

    async fn detach_managed_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;

    /// Fails at the provider if any policy is still attached.
    async fn delete_role(&self, name: &str) -> Result<()>;

    async fn delete_log_group(&self, name: &str) -> Result<()>;
}
