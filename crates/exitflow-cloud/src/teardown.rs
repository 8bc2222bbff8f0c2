//! Teardown orchestrator
//!
//! Discover → confirm → delete in reverse dependency order, degrading to
//! warnings on individual failures. Also classifies deployments that
//! predate ownership tagging so the caller can message them differently.

use crate::delete::{DeleteFailure, delete_all};
use crate::discovery::discover;
use crate::error::{CloudError, Result};
use crate::progress::{Progress, step};
use crate::provider::ControlPlaneProvider;
use crate::state::{ControlPlaneState, ResourceKind};

/// The exact token a caller must supply before anything is deleted.
pub const CONFIRMATION_TOKEN: &str = "DELETE";

#[derive(Debug, Default)]
pub struct TeardownOutcome {
    /// False when discovery found nothing — teardown was a no-op.
    pub found: bool,
    /// True when resources exist but none carry the ownership tag.
    pub legacy: bool,
    pub deleted: Vec<ResourceKind>,
    pub failures: Vec<DeleteFailure>,
}

/// True iff at least one resource exists and none of them carry the
/// ownership tag — a deployment created by some other process (an old
/// OpenTofu/Terraform run, say). One tagged resource is enough to treat
/// the whole deployment as ours. Messaging only; deletion is unaffected.
pub fn is_legacy_deployment(state: &ControlPlaneState) -> bool {
    let resources = [&state.log_group, &state.role, &state.function];
    let found = resources.iter().filter_map(|r| r.as_ref());

    let mut any = false;
    let mut any_owned = false;
    for resource in found {
        any = true;
        if resource.is_owned() {
            any_owned = true;
        }
    }
    any && !any_owned
}

/// What a teardown of this state would delete, as (kind, detail) rows in
/// deletion order — for the caller's confirmation display.
pub fn deletion_plan(state: &ControlPlaneState) -> Vec<(ResourceKind, String)> {
    let mut plan = Vec::new();
    if let Some(url) = &state.function_url {
        if !url.is_empty() {
            plan.push((ResourceKind::FunctionUrl, url.clone()));
        }
    }
    if let Some(function) = &state.function {
        plan.push((ResourceKind::Function, function.name.clone()));
    }
    if let Some(name) = &state.policies.inline_name {
        if !name.is_empty() {
            plan.push((ResourceKind::InlinePolicy, name.clone()));
        }
    }
    if state.policies.managed_attached {
        plan.push((
            ResourceKind::ManagedPolicyAttachment,
            "AWSLambdaBasicExecutionRole".to_string(),
        ));
    }
    if let Some(role) = &state.role {
        plan.push((ResourceKind::Role, role.name.clone()));
    }
    if let Some(log_group) = &state.log_group {
        plan.push((ResourceKind::LogGroup, log_group.name.clone()));
    }
    plan
}

/// Tear down the whole control plane.
///
/// The confirmation token is checked before any provider call; a mismatch
/// is a precondition error and nothing is deleted.
pub async fn run_teardown<P>(
    provider: &P,
    confirmation: &str,
    progress: &dyn Progress,
) -> Result<TeardownOutcome>
where
    P: ControlPlaneProvider + ?Sized,
{
    if confirmation != CONFIRMATION_TOKEN {
        return Err(CloudError::ConfirmationMismatch);
    }

    let state = step(progress, "Discovering infrastructure", discover(provider)).await?;

    if !state.exists() {
        progress.note("No infrastructure found");
        return Ok(TeardownOutcome::default());
    }

    let legacy = is_legacy_deployment(&state);
    if legacy {
        progress.note("Resources found without the ownership tag — foreign deployment");
    }

    let (deleted, failures) = delete_all(provider, &state, progress).await;

    Ok(TeardownOutcome {
        found: true,
        legacy,
        deleted,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use crate::state::{PolicyState, Resource};
    use crate::testing::MockProvider;
    use std::collections::HashMap;

    fn tagged(name: &str) -> Resource {
        Resource::new(name, "arn").with_tags(crate::standard_tags())
    }

    fn untagged(name: &str) -> Resource {
        Resource::new(name, "arn")
    }

    #[test]
    fn no_resources_is_not_legacy() {
        assert!(!is_legacy_deployment(&ControlPlaneState::default()));
    }

    #[test]
    fn fully_tagged_is_not_legacy() {
        let state = ControlPlaneState {
            log_group: Some(tagged("log")),
            role: Some(tagged("role")),
            function: Some(tagged("fn")),
            ..Default::default()
        };
        assert!(!is_legacy_deployment(&state));
    }

    #[test]
    fn all_untagged_is_legacy() {
        let state = ControlPlaneState {
            log_group: Some(untagged("log")),
            role: Some(untagged("role")),
            function: Some(untagged("fn")),
            ..Default::default()
        };
        assert!(is_legacy_deployment(&state));
    }

    #[test]
    fn wrong_tag_values_are_legacy() {
        let foreign = |name: &str, value: &str| {
            Resource::new(name, "arn").with_tags(HashMap::from([(
                "ManagedBy".to_string(),
                value.to_string(),
            )]))
        };
        let state = ControlPlaneState {
            log_group: Some(foreign("log", "terraform")),
            role: Some(foreign("role", "manual")),
            ..Default::default()
        };
        assert!(is_legacy_deployment(&state));
    }

    #[test]
    fn one_tagged_resource_claims_the_deployment() {
        let state = ControlPlaneState {
            log_group: Some(tagged("log")),
            role: Some(untagged("role")),
            function: Some(untagged("fn")),
            ..Default::default()
        };
        assert!(!is_legacy_deployment(&state));

        let state = ControlPlaneState {
            log_group: Some(untagged("log")),
            function: Some(tagged("fn")),
            ..Default::default()
        };
        assert!(!is_legacy_deployment(&state));
    }

    #[test]
    fn partial_untagged_deployment_is_legacy() {
        let state = ControlPlaneState {
            role: Some(Resource::new("role", "arn").with_tags(HashMap::from([(
                "Project".to_string(),
                "something-else".to_string(),
            )]))),
            ..Default::default()
        };
        assert!(is_legacy_deployment(&state));
    }

    #[test]
    fn plan_lists_resources_in_deletion_order() {
        let state = ControlPlaneState {
            log_group: Some(tagged("log")),
            role: Some(tagged("role")),
            function: Some(tagged("fn")),
            function_url: Some("https://x.on.aws/".to_string()),
            policies: PolicyState {
                managed_attached: true,
                inline_name: Some("inline".to_string()),
                inline_document: None,
            },
        };
        let kinds: Vec<ResourceKind> = deletion_plan(&state).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::FunctionUrl,
                ResourceKind::Function,
                ResourceKind::InlinePolicy,
                ResourceKind::ManagedPolicyAttachment,
                ResourceKind::Role,
                ResourceKind::LogGroup,
            ]
        );
    }

    #[tokio::test]
    async fn wrong_confirmation_deletes_nothing() {
        let provider = MockProvider::complete();
        let err = run_teardown(&provider, "delete", &NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::ConfirmationMismatch));
        assert_eq!(provider.delete_calls(), 0);
    }

    #[tokio::test]
    async fn tears_down_a_complete_deployment() {
        let provider = MockProvider::complete();
        let outcome = run_teardown(&provider, CONFIRMATION_TOKEN, &NullProgress)
            .await
            .unwrap();

        assert!(outcome.found);
        assert!(!outcome.legacy);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.deleted.len(), 6);
    }

    #[tokio::test]
    async fn empty_account_is_a_no_op() {
        let provider = MockProvider::default();
        let outcome = run_teardown(&provider, CONFIRMATION_TOKEN, &NullProgress)
            .await
            .unwrap();
        assert!(!outcome.found);
        assert_eq!(provider.delete_calls(), 0);
    }

    #[tokio::test]
    async fn flags_legacy_deployments_but_deletes_anyway() {
        let provider = MockProvider::default();
        provider.seed_untagged_role();
        let outcome = run_teardown(&provider, CONFIRMATION_TOKEN, &NullProgress)
            .await
            .unwrap();

        assert!(outcome.found);
        assert!(outcome.legacy);
        assert_eq!(outcome.deleted, vec![ResourceKind::Role]);
    }
}
