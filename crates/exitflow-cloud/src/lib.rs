//! ExitFlow control-plane reconciliation engine
//!
//! Converges a fixed set of six provider resources (log group, execution
//! role, two policy attachments, function, public function URL) toward the
//! deployed state with no state file: every decision is recomputed from a
//! fresh tag-based discovery pass against the provider.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ExitFlow CLI / agent             │
//! └───────────────────┬──────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────┐
//! │               exitflow-cloud                  │
//! │   discover ─► diff ─► create / delete ─► re-  │
//! │   discover, over trait ControlPlaneProvider   │
//! └───────────────────┬──────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────┐
//! │             exitflow-cloud-aws                │
//! │      IAM / Lambda / CloudWatch Logs SDKs      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Creation is dependency-ordered and tolerates the provider's IAM
//! propagation window; deletion runs in reverse order and degrades to
//! best-effort. Orchestrators report through the [`Progress`] trait so the
//! engine carries no terminal or styling dependency.

pub mod create;
pub mod delete;
pub mod discovery;
pub mod error;
pub mod progress;
pub mod provider;
pub mod retry;
pub mod setup;
pub mod state;
pub mod teardown;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;

// Re-exports
pub use create::{create_endpoint, create_function_with_retry};
pub use delete::{DeleteFailure, delete_all};
pub use discovery::discover;
pub use error::{CloudError, Result};
pub use progress::{NullProgress, Progress};
pub use provider::{ControlPlaneProvider, FunctionSpec, InlinePolicy};
pub use retry::{RetryPolicy, is_role_propagation_error};
pub use setup::{SetupOptions, SetupOutcome, run_setup};
pub use state::{ControlPlaneState, PolicyState, Resource, ResourceKind};
pub use teardown::{
    CONFIRMATION_TOKEN, TeardownOutcome, deletion_plan, is_legacy_deployment, run_teardown,
};

/// Fixed control-plane resource names. Discovery, creation and deletion all
/// key off these; there is deliberately no way to configure them.
pub const FUNCTION_NAME: &str = "exitflow-nodes";
pub const ROLE_NAME: &str = "exitflow-nodes-lambda-role";
pub const INLINE_POLICY_NAME: &str = "exitflow-nodes-lambda-ec2-policy";
pub const LOG_GROUP_NAME: &str = "/aws/lambda/exitflow-nodes";

/// AWS managed policy granting basic Lambda execution (log writes).
pub const MANAGED_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Ownership tag applied to every control-plane resource we create.
pub const MANAGED_BY_TAG_KEY: &str = "ManagedBy";
pub const MANAGED_BY_TAG_VALUE: &str = "exitflow";

pub const LOG_RETENTION_DAYS: i32 = 14;

/// Environment variable names baked into the deployed function.
pub const ENV_TAILSCALE_AUTH_KEY: &str = "TAILSCALE_AUTH_KEY";
pub const ENV_AUTH_TOKEN: &str = "EXITFLOW_AUTH_TOKEN";

/// The standard tag set for control-plane resources.
pub fn standard_tags() -> HashMap<String, String> {
    HashMap::from([(
        MANAGED_BY_TAG_KEY.to_string(),
        MANAGED_BY_TAG_VALUE.to_string(),
    )])
}
