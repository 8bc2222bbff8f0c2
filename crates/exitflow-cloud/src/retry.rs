//! Propagation-delay classification and retry policy
//!
//! Freshly created IAM roles are not immediately assumable by the compute
//! platform. The only signal the SDK exposes for this is the error text, so
//! the magic strings live here and nowhere else.

use std::time::Duration;

use crate::error::CloudError;

/// Bounded fixed-interval retry schedule for function creation. The
/// defaults are empirical tuning, not invariants — callers may override.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// True only for the IAM eventual-consistency error family: an
/// `InvalidParameterValueException` saying the role cannot be assumed yet.
/// Anything broader risks retrying permanent failures forever; anything
/// narrower fails deploys during normal propagation delay.
pub fn is_role_propagation_error(err: &CloudError) -> bool {
    let message = err.to_string();
    message.contains("InvalidParameterValueException") && message.contains("cannot be assumed")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(message: &str) -> CloudError {
        CloudError::api("CreateFunction", message)
    }

    #[test]
    fn matches_the_propagation_signature() {
        let err = api_error(
            "InvalidParameterValueException: The role defined for the function \
             cannot be assumed by Lambda.",
        );
        assert!(is_role_propagation_error(&err));
    }

    #[test]
    fn requires_both_parts_of_the_signature() {
        assert!(!is_role_propagation_error(&api_error(
            "InvalidParameterValueException: Unzipped size must be smaller than the limit"
        )));
        assert!(!is_role_propagation_error(&api_error(
            "the role cannot be assumed"
        )));
    }

    #[test]
    fn rejects_other_provider_errors() {
        assert!(!is_role_propagation_error(&api_error(
            "AccessDeniedException: not authorized to perform lambda:CreateFunction"
        )));
        assert!(!is_role_propagation_error(&api_error(
            "ResourceConflictException: Function already exist"
        )));
        assert!(!is_role_propagation_error(&CloudError::Packaging(
            "linker exited with status 1".to_string()
        )));
    }

    #[test]
    fn default_policy_is_one_second_for_two_minutes() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.timeout, Duration::from_secs(120));
    }
}
