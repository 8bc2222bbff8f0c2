//! Control-plane deletion
//!
//! Strict reverse dependency order: function URL → function → inline policy
//! → managed-policy detach → role → log group. Detaching both policies
//! before deleting the role is a provider precondition, not a preference.
//! Each deletion is independent — a failure is recorded as a warning and
//! the sequence continues.

use crate::error::Result;
use crate::progress::Progress;
use crate::provider::ControlPlaneProvider;
use crate::state::{ControlPlaneState, ResourceKind};
use crate::{LOG_GROUP_NAME, MANAGED_POLICY_ARN};

/// One resource whose deletion failed.
#[derive(Debug, Clone)]
pub struct DeleteFailure {
    pub kind: ResourceKind,
    pub message: String,
}

/// Delete every discovered resource, best effort.
///
/// Returns the kinds deleted and the failures collected. Never returns an
/// error: deletion degrades, it does not abort.
pub async fn delete_all<P>(
    provider: &P,
    state: &ControlPlaneState,
    progress: &dyn Progress,
) -> (Vec<ResourceKind>, Vec<DeleteFailure>)
where
    P: ControlPlaneProvider + ?Sized,
{
    let mut deleted = Vec::new();
    let mut failures = Vec::new();

    let mut record = |kind: ResourceKind, result: Result<()>| match result {
        Ok(()) => {
            progress.step_done(kind.label());
            deleted.push(kind);
        }
        Err(err) => {
            let message = err.to_string();
            tracing::warn!(resource = kind.label(), error = %message, "deletion failed");
            progress.warn(kind.label(), &message);
            failures.push(DeleteFailure { kind, message });
        }
    };

    if state.has(ResourceKind::FunctionUrl) {
        if let Some(function) = &state.function {
            progress.step_started(ResourceKind::FunctionUrl.label());
            record(
                ResourceKind::FunctionUrl,
                provider.delete_function_url(&function.name).await,
            );
        }
    }

    if let Some(function) = &state.function {
        progress.step_started(ResourceKind::Function.label());
        record(
            ResourceKind::Function,
            provider.delete_function(&function.name).await,
        );
    }

    if let (Some(inline_name), Some(role)) = (&state.policies.inline_name, &state.role) {
        progress.step_started(ResourceKind::InlinePolicy.label());
        record(
            ResourceKind::InlinePolicy,
            provider.delete_inline_policy(&role.name, inline_name).await,
        );
    }

    if state.policies.managed_attached {
        if let Some(role) = &state.role {
            progress.step_started(ResourceKind::ManagedPolicyAttachment.label());
            record(
                ResourceKind::ManagedPolicyAttachment,
                provider
                    .detach_managed_policy(&role.name, MANAGED_POLICY_ARN)
                    .await,
            );
        }
    }

    if let Some(role) = &state.role {
        progress.step_started(ResourceKind::Role.label());
        record(ResourceKind::Role, provider.delete_role(&role.name).await);
    }

    if state.log_group.is_some() {
        progress.step_started(ResourceKind::LogGroup.label());
        record(
            ResourceKind::LogGroup,
            provider.delete_log_group(LOG_GROUP_NAME).await,
        );
    }

    (deleted, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::discover;
    use crate::progress::NullProgress;
    use crate::testing::MockProvider;

    #[tokio::test]
    async fn deletes_everything_in_reverse_order() {
        let provider = MockProvider::complete();
        let state = discover(&provider).await.unwrap();

        let (deleted, failures) = delete_all(&provider, &state, &NullProgress).await;

        assert!(failures.is_empty());
        assert_eq!(
            deleted,
            vec![
                ResourceKind::FunctionUrl,
                ResourceKind::Function,
                ResourceKind::InlinePolicy,
                ResourceKind::ManagedPolicyAttachment,
                ResourceKind::Role,
                ResourceKind::LogGroup,
            ]
        );

        let after = discover(&provider).await.unwrap();
        assert!(!after.exists());
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_rest() {
        let provider = MockProvider::complete();
        provider.fail_delete("DeleteFunction");
        let state = discover(&provider).await.unwrap();

        let (deleted, failures) = delete_all(&provider, &state, &NullProgress).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, ResourceKind::Function);
        // Everything downstream of the failure was still attempted.
        assert!(deleted.contains(&ResourceKind::Role));
        assert!(deleted.contains(&ResourceKind::LogGroup));
        assert_eq!(deleted.len(), 5);
    }

    #[tokio::test]
    async fn partial_state_only_deletes_what_exists() {
        let provider = MockProvider::default();
        provider.seed_role("arn:role");
        let state = discover(&provider).await.unwrap();

        let (deleted, failures) = delete_all(&provider, &state, &NullProgress).await;

        assert!(failures.is_empty());
        assert_eq!(deleted, vec![ResourceKind::Role]);
        assert_eq!(provider.delete_calls(), 1);
    }
}
