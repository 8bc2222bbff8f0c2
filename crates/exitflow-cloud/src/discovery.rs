//! Tag-based control-plane discovery
//!
//! One read-only pass over the provider producing a fresh
//! [`ControlPlaneState`]. "Not found" is absence, not an error; only
//! unexpected provider failures (permissions, malformed responses) abort
//! the pass. No retries, no caching — callers needing a fresh view call
//! again.

use crate::provider::ControlPlaneProvider;
use crate::state::ControlPlaneState;
use crate::{FUNCTION_NAME, INLINE_POLICY_NAME, LOG_GROUP_NAME, MANAGED_POLICY_ARN, ROLE_NAME};
use crate::error::Result;

/// Discover the full control-plane state.
///
/// Tag validation is deliberately lenient: a resource found without the
/// ownership tag is still recorded so that legacy/foreign deployments are
/// detected rather than hidden.
pub async fn discover<P>(provider: &P) -> Result<ControlPlaneState>
where
    P: ControlPlaneProvider + ?Sized,
{
    let mut state = ControlPlaneState::default();

    // IAM (global, but still checked per region entry point)
    if let Some(role) = provider.get_role(ROLE_NAME).await? {
        let attached = provider.list_attached_policy_arns(ROLE_NAME).await?;
        state.policies.managed_attached = attached.iter().any(|arn| arn == MANAGED_POLICY_ARN);

        if let Some(inline) = provider
            .get_inline_policy(ROLE_NAME, INLINE_POLICY_NAME)
            .await?
        {
            state.policies.inline_name = Some(inline.name);
            state.policies.inline_document = Some(inline.document);
        }

        tracing::debug!(role = %role.name, "discovered execution role");
        state.role = Some(role);
    }

    // Function + public URL
    if let Some(function) = provider.get_function(FUNCTION_NAME).await? {
        state.function_url = provider.get_function_url(FUNCTION_NAME).await?;
        tracing::debug!(function = %function.name, url = ?state.function_url, "discovered function");
        state.function = Some(function);
    }

    // Log group
    state.log_group = provider.find_log_group(LOG_GROUP_NAME).await?;

    Ok(state)
}
