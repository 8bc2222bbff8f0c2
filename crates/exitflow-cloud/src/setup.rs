//! Setup orchestrator
//!
//! Drives the control plane to the deployed state: discover → (done if
//! complete) → check prerequisites → create exactly the missing resources
//! in dependency order → re-discover and report ground truth. Running it
//! against an already-complete deployment performs zero creation calls.

use std::collections::HashMap;
use std::fmt::Write as _;

use rand::RngCore;

use crate::create::{
    ASSUME_ROLE_POLICY, INLINE_POLICY_DOCUMENT, create_endpoint, create_function_with_retry,
};
use crate::discovery::discover;
use crate::error::{CloudError, Result};
use crate::progress::{Progress, step};
use crate::provider::{ControlPlaneProvider, FunctionSpec};
use crate::retry::RetryPolicy;
use crate::state::{ControlPlaneState, ResourceKind};
use crate::{
    ENV_AUTH_TOKEN, ENV_TAILSCALE_AUTH_KEY, FUNCTION_NAME, INLINE_POLICY_NAME, LOG_GROUP_NAME,
    MANAGED_POLICY_ARN, ROLE_NAME,
};

/// Inputs resolved by the caller (environment, flags). The engine itself
/// never reads the environment.
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// The VPN join key baked into the function. Required before any
    /// creation begins.
    pub tailscale_auth_key: Option<String>,
    /// Existing API auth token to reuse; a fresh one is generated when
    /// absent.
    pub auth_token: Option<String>,
    pub retry: RetryPolicy,
}

/// The deployment result, including the credential the caller must surface.
#[derive(Debug)]
pub struct SetupOutcome {
    /// Ground truth re-discovered after creation.
    pub state: ControlPlaneState,
    /// The auth token in effect for this deployment.
    pub auth_token: String,
    /// True when the token was freshly generated and must be saved.
    pub was_generated: bool,
}

/// Deploy the control plane, creating only what discovery proved missing.
///
/// `package` produces the function deployment archive; it is only invoked
/// when the function itself is missing, and its failure surfaces as
/// [`CloudError::Packaging`].
pub async fn run_setup<P, F>(
    provider: &P,
    options: SetupOptions,
    package: F,
    progress: &dyn Progress,
) -> Result<SetupOutcome>
where
    P: ControlPlaneProvider + ?Sized,
    F: FnOnce() -> std::result::Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>,
{
    // 1. Ground truth.
    let state = step(progress, "Discovering existing infrastructure", discover(provider)).await?;

    if state.is_complete() {
        progress.note("Infrastructure already deployed");
        return Ok(SetupOutcome {
            state,
            auth_token: options.auth_token.unwrap_or_default(),
            was_generated: false,
        });
    }

    let missing = state.missing();
    progress.note(&format!("{} resources missing, creating", missing.len()));

    // 2. Prerequisites, before any creation side effect.
    let tailscale_auth_key = options
        .tailscale_auth_key
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            CloudError::missing_secret(
                ENV_TAILSCALE_AUTH_KEY,
                "\n\nHint: export your Tailscale auth key:\n  export TAILSCALE_AUTH_KEY=tskey-auth-...",
            )
        })?;

    let (auth_token, was_generated) = match options.auth_token.filter(|token| !token.is_empty()) {
        Some(token) => (token, false),
        None => (generate_auth_token(), true),
    };

    // 3. Create missing resources in dependency order.
    if state.log_group.is_none() {
        step(
            progress,
            "Creating log group",
            provider.create_log_group(LOG_GROUP_NAME, crate::LOG_RETENTION_DAYS),
        )
        .await?;
    }

    let role_arn = match &state.role {
        Some(role) => role.arn.clone(),
        None => {
            step(
                progress,
                "Creating execution role",
                provider.create_role(ROLE_NAME, ASSUME_ROLE_POLICY),
            )
            .await?
        }
    };

    if !state.policies.managed_attached {
        step(
            progress,
            "Attaching managed execution policy",
            provider.attach_managed_policy(ROLE_NAME, MANAGED_POLICY_ARN),
        )
        .await?;
    }

    if !state.has(ResourceKind::InlinePolicy) {
        step(
            progress,
            "Creating inline EC2/VPC policy",
            provider.put_inline_policy(ROLE_NAME, INLINE_POLICY_NAME, INLINE_POLICY_DOCUMENT),
        )
        .await?;
    }

    // 4. The function needs the role and both attachments in place, plus
    // the packaged artifact. Creation rides out IAM propagation delay.
    if state.function.is_none() {
        progress.step_started("Building function artifact");
        let archive = match package() {
            Ok(archive) => {
                progress.step_done("Building function artifact");
                archive
            }
            Err(err) => {
                progress.step_failed("Building function artifact");
                return Err(CloudError::Packaging(err.to_string()));
            }
        };

        let spec = FunctionSpec {
            name: FUNCTION_NAME.to_string(),
            role_arn,
            archive,
            environment: HashMap::from([
                (ENV_TAILSCALE_AUTH_KEY.to_string(), tailscale_auth_key),
                (ENV_AUTH_TOKEN.to_string(), auth_token.clone()),
            ]),
        };

        step(
            progress,
            "Creating function",
            create_function_with_retry(provider, &spec, &options.retry, progress),
        )
        .await?;
    }

    if !state.has(ResourceKind::FunctionUrl) {
        step(
            progress,
            "Creating public function URL",
            create_endpoint(provider, FUNCTION_NAME),
        )
        .await?;
    }

    // 5. Do not trust anything accumulated above — re-discover.
    let final_state = step(progress, "Verifying deployment", discover(provider)).await?;

    Ok(SetupOutcome {
        state: final_state,
        auth_token,
        was_generated,
    })
}

/// 256 bits from the OS entropy source, hex-encoded. If the secure source
/// is unavailable the fallback is a timestamp-derived token — weaker, and
/// logged as such rather than silently substituted.
fn generate_auth_token() -> String {
    let mut bytes = [0u8; 32];
    match rand::rngs::OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => {
            let mut token = String::with_capacity(64);
            for byte in bytes {
                let _ = write!(token, "{byte:02x}");
            }
            token
        }
        Err(err) => {
            tracing::warn!(
                error = %err,
                "secure random source unavailable, falling back to a timestamp-derived token"
            );
            format!(
                "exitflow-{}",
                chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use crate::testing::MockProvider;

    fn options() -> SetupOptions {
        SetupOptions {
            tailscale_auth_key: Some("tskey-auth-test".to_string()),
            auth_token: None,
            retry: RetryPolicy::default(),
        }
    }

    fn archive() -> std::result::Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(vec![0x50, 0x4b, 0x03, 0x04])
    }

    #[tokio::test]
    async fn deploys_everything_from_scratch() {
        let provider = MockProvider::default();
        let outcome = run_setup(&provider, options(), || archive(), &NullProgress)
            .await
            .unwrap();

        assert!(outcome.state.is_complete());
        assert!(outcome.was_generated);
        assert_eq!(outcome.auth_token.len(), 64);
        assert!(outcome.auth_token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let provider = MockProvider::default();
        run_setup(&provider, options(), || archive(), &NullProgress)
            .await
            .unwrap();
        let calls_after_first = provider.create_calls();

        let outcome = run_setup(&provider, options(), || archive(), &NullProgress)
            .await
            .unwrap();

        assert!(outcome.state.is_complete());
        assert!(!outcome.was_generated);
        assert_eq!(provider.create_calls(), calls_after_first);
    }

    #[tokio::test]
    async fn creates_only_missing_resources() {
        let provider = MockProvider::default();
        provider.seed_role("arn:aws:iam::123456789012:role/exitflow-nodes-lambda-role");
        provider.seed_managed_policy();

        run_setup(&provider, options(), || archive(), &NullProgress)
            .await
            .unwrap();

        // log group + inline policy + function + url config + invoke grant
        assert_eq!(provider.create_calls(), 5);
    }

    #[tokio::test]
    async fn missing_join_key_is_a_precondition_error() {
        let provider = MockProvider::default();
        let err = run_setup(
            &provider,
            SetupOptions::default(),
            || archive(),
            &NullProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::MissingSecret { name, .. } if name == "TAILSCALE_AUTH_KEY"));
        assert_eq!(provider.create_calls(), 0);
    }

    #[tokio::test]
    async fn complete_state_skips_the_secret_check() {
        // No join key in the environment, but nothing to create either.
        let provider = MockProvider::complete();
        let outcome = run_setup(
            &provider,
            SetupOptions {
                auth_token: Some("existing-token".to_string()),
                ..Default::default()
            },
            || archive(),
            &NullProgress,
        )
        .await
        .unwrap();

        assert_eq!(outcome.auth_token, "existing-token");
        assert!(!outcome.was_generated);
        assert_eq!(provider.create_calls(), 0);
    }

    #[tokio::test]
    async fn reuses_a_provided_auth_token() {
        let provider = MockProvider::default();
        let outcome = run_setup(
            &provider,
            SetupOptions {
                auth_token: Some("keep-me".to_string()),
                ..options()
            },
            || archive(),
            &NullProgress,
        )
        .await
        .unwrap();

        assert_eq!(outcome.auth_token, "keep-me");
        assert!(!outcome.was_generated);
    }

    #[tokio::test]
    async fn packaging_failure_is_distinct_and_fatal() {
        let provider = MockProvider::default();
        let err = run_setup(
            &provider,
            options(),
            || Err("cargo exited with status 101".into()),
            &NullProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::Packaging(_)));
        // Everything up to the function was created; the function was not.
        assert_eq!(provider.create_function_calls(), 0);
    }

    #[test]
    fn generated_tokens_are_unique_hex() {
        let first = generate_auth_token();
        let second = generate_auth_token();
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
    }
}
