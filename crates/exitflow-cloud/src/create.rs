//! Control-plane resource creation
//!
//! The policy documents and the one genuinely delicate piece of the deploy
//! path: creating the function while the freshly created execution role is
//! still propagating through the provider's consistency machinery.

use crate::error::{CloudError, Result};
use crate::progress::Progress;
use crate::provider::{ControlPlaneProvider, FunctionSpec};
use crate::retry::{RetryPolicy, is_role_propagation_error};

/// Trust policy letting the compute platform assume the execution role.
pub const ASSUME_ROLE_POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Principal": {
        "Service": "lambda.amazonaws.com"
      },
      "Action": "sts:AssumeRole"
    }
  ]
}"#;

/// EC2/VPC permissions the control function needs to manage the ephemeral
/// node family, plus read access to the public AMI parameters.
pub const INLINE_POLICY_DOCUMENT: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Action": [
        "ec2:RunInstances",
        "ec2:TerminateInstances",
        "ec2:DescribeInstances",
        "ec2:DescribeInstanceStatus",
        "ec2:DescribeImages",
        "ec2:CreateSecurityGroup",
        "ec2:DeleteSecurityGroup",
        "ec2:DescribeSecurityGroups",
        "ec2:AuthorizeSecurityGroupIngress",
        "ec2:AuthorizeSecurityGroupEgress",
        "ec2:RevokeSecurityGroupIngress",
        "ec2:RevokeSecurityGroupEgress",
        "ec2:DescribeVpcs",
        "ec2:CreateVpc",
        "ec2:DescribeSubnets",
        "ec2:CreateSubnet",
        "ec2:ModifySubnetAttribute",
        "ec2:DescribeAvailabilityZones",
        "ec2:DescribeRouteTables",
        "ec2:CreateRoute",
        "ec2:DescribeInternetGateways",
        "ec2:CreateInternetGateway",
        "ec2:AttachInternetGateway",
        "ec2:DetachInternetGateway",
        "ec2:DeleteInternetGateway",
        "ec2:DeleteSubnet",
        "ec2:DeleteVpc",
        "ec2:DeleteRoute",
        "ec2:CreateTags",
        "ec2:DescribeTags"
      ],
      "Resource": "*"
    },
    {
      "Effect": "Allow",
      "Action": [
        "ssm:GetParameter",
        "ssm:GetParameters"
      ],
      "Resource": [
        "arn:aws:ssm:*:*:parameter/aws/service/ami-amazon-linux-latest/*",
        "arn:aws:ssm:*:*:parameter/aws/service/canonical/ubuntu/server/*"
      ]
    }
  ]
}"#;

/// Create the function, riding out the IAM propagation window.
///
/// First attempt is immediate. If it fails with the narrowly classified
/// "role cannot be assumed yet" signature, retries on `policy.interval`
/// until `policy.timeout` elapses; any other error aborts at once. The loop
/// blocks the calling orchestration step for up to the timeout — wrap the
/// call in `tokio::time::timeout` to impose an outer deadline.
pub async fn create_function_with_retry<P>(
    provider: &P,
    spec: &FunctionSpec,
    policy: &RetryPolicy,
    progress: &dyn Progress,
) -> Result<String>
where
    P: ControlPlaneProvider + ?Sized,
{
    match provider.create_function(spec).await {
        Ok(arn) => return Ok(arn),
        Err(err) if is_role_propagation_error(&err) => {
            tracing::debug!(error = %err, "role not yet assumable, entering retry loop");
        }
        Err(err) => return Err(err),
    }

    let deadline = tokio::time::Instant::now() + policy.timeout;
    let mut attempt: u32 = 1;

    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(CloudError::PropagationTimeout(policy.timeout));
        }

        progress.propagation_wait(attempt);
        tokio::time::sleep(policy.interval).await;

        match provider.create_function(spec).await {
            Ok(arn) => return Ok(arn),
            Err(err) if is_role_propagation_error(&err) => {
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Create the public endpoint: the URL config first, then the invoke
/// permission naming the public auth mode. Both calls are required — with
/// only the first, the endpoint exists but rejects every request.
pub async fn create_endpoint<P>(provider: &P, function_name: &str) -> Result<String>
where
    P: ControlPlaneProvider + ?Sized,
{
    let url = provider.create_function_url(function_name).await?;
    provider.allow_public_invoke(function_name).await?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use crate::testing::{MockProvider, PROPAGATION_MESSAGE};
    use std::time::Duration;

    fn spec() -> FunctionSpec {
        FunctionSpec {
            name: "exitflow-nodes".to_string(),
            role_arn: "arn:aws:iam::123456789012:role/test".to_string(),
            archive: vec![0x50, 0x4b],
            environment: Default::default(),
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn succeeds_without_retrying() {
        let provider = MockProvider::default();
        let arn = create_function_with_retry(&provider, &spec(), &quick_policy(), &NullProgress)
            .await
            .unwrap();
        assert!(arn.contains("exitflow-nodes"));
        assert_eq!(provider.create_function_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_through_the_propagation_window() {
        let provider = MockProvider::default();
        provider.fail_function_creates(PROPAGATION_MESSAGE, 3);

        let arn = create_function_with_retry(&provider, &spec(), &quick_policy(), &NullProgress)
            .await
            .unwrap();
        assert!(arn.contains("exitflow-nodes"));
        assert_eq!(provider.create_function_calls(), 4);
    }

    #[tokio::test]
    async fn aborts_immediately_on_other_errors() {
        let provider = MockProvider::default();
        provider.fail_function_creates("AccessDeniedException: not authorized", 1);

        let err = create_function_with_retry(&provider, &spec(), &quick_policy(), &NullProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("AccessDeniedException"));
        assert_eq!(provider.create_function_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_timeout() {
        let provider = MockProvider::default();
        // More failures than the window allows.
        provider.fail_function_creates(PROPAGATION_MESSAGE, 1000);

        let err = create_function_with_retry(&provider, &spec(), &quick_policy(), &NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::PropagationTimeout(_)));
    }

    #[tokio::test]
    async fn endpoint_creation_grants_public_invoke() {
        let provider = MockProvider::default();
        let url = create_endpoint(&provider, "exitflow-nodes").await.unwrap();
        assert!(url.starts_with("https://"));
        assert!(provider.public_invoke_allowed());
    }

    #[test]
    fn policy_documents_are_valid_json() {
        serde_json::from_str::<serde_json::Value>(ASSUME_ROLE_POLICY).unwrap();
        serde_json::from_str::<serde_json::Value>(INLINE_POLICY_DOCUMENT).unwrap();
    }
}
