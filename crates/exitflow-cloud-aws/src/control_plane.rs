//! Control-plane provider over IAM, Lambda and CloudWatch Logs

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs as logs;
use aws_sdk_iam as iam;
use aws_sdk_lambda as lambda;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{
    Architecture, Cors, Environment, FunctionCode, FunctionUrlAuthType, Runtime,
};

use exitflow_cloud::{
    CloudError, ControlPlaneProvider, FunctionSpec, InlinePolicy, Resource, Result, standard_tags,
};

/// Statement id for the public function-URL invoke grant.
const PUBLIC_INVOKE_STATEMENT_ID: &str = "FunctionUrlAllowPublicAccess";

/// AWS clients for the control plane. IAM is a global service but is still
/// constructed from the regional config, matching the entry-point contract.
pub struct AwsControlPlane {
    iam: iam::Client,
    lambda: lambda::Client,
    logs: logs::Client,
}

impl AwsControlPlane {
    pub async fn new(region: &str) -> Self {
        let config = crate::load_config(region).await;
        Self::from_config(&config)
    }

    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            iam: iam::Client::new(config),
            lambda: lambda::Client::new(config),
            logs: logs::Client::new(config),
        }
    }
}

/// Stringify a service error with its full context. The exception name
/// survives (`InvalidParameterValueException: ...`), which the retry
/// classifier depends on.
fn api_error<E>(op: &'static str, err: E) -> CloudError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CloudError::api(op, format!("{}", iam::error::DisplayErrorContext(err)))
}

#[async_trait]
impl ControlPlaneProvider for AwsControlPlane {
    async fn get_role(&self, name: &str) -> Result<Option<Resource>> {
        let output = match self.iam.get_role().role_name(name).send().await {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_entity_exception() {
                    return Ok(None);
                }
                return Err(api_error("GetRole", service_err));
            }
        };

        let role = output
            .role
            .ok_or_else(|| CloudError::api("GetRole", "response carried no role"))?;

        // Tags come from a separate call; failures here are unexpected and
        // do propagate.
        let tags_output = self
            .iam
            .list_role_tags()
            .role_name(name)
            .send()
            .await
            .map_err(|err| api_error("ListRoleTags", err.into_service_error()))?;

        let tags: HashMap<String, String> = tags_output
            .tags
            .into_iter()
            .map(|tag| (tag.key, tag.value))
            .collect();

        Ok(Some(
            Resource::new(role.role_name, role.arn).with_tags(tags),
        ))
    }

    async fn list_attached_policy_arns(&self, role_name: &str) -> Result<Vec<String>> {
        let output = self
            .iam
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .map_err(|err| api_error("ListAttachedRolePolicies", err.into_service_error()))?;

        Ok(output
            .attached_policies
            .unwrap_or_default()
            .into_iter()
            .filter_map(|policy| policy.policy_arn)
            .collect())
    }

    async fn get_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> Result<Option<InlinePolicy>> {
        match self
            .iam
            .get_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await
        {
            Ok(output) => Ok(Some(InlinePolicy {
                name: output.policy_name,
                document: output.policy_document,
            })),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_entity_exception() {
                    return Ok(None);
                }
                Err(api_error("GetRolePolicy", service_err))
            }
        }
    }

    async fn get_function(&self, name: &str) -> Result<Option<Resource>> {
        let output = match self.lambda.get_function().function_name(name).send().await {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    return Ok(None);
                }
                return Err(api_error("GetFunction", service_err));
            }
        };

        let configuration = output
            .configuration
            .ok_or_else(|| CloudError::api("GetFunction", "response carried no configuration"))?;
        let arn = configuration.function_arn.unwrap_or_default();

        let tags_output = self
            .lambda
            .list_tags()
            .resource(&arn)
            .send()
            .await
            .map_err(|err| api_error("ListTags", err.into_service_error()))?;

        Ok(Some(
            Resource::new(configuration.function_name.unwrap_or_default(), arn)
                .with_tags(tags_output.tags.unwrap_or_default()),
        ))
    }

    async fn get_function_url(&self, function_name: &str) -> Result<Option<String>> {
        match self
            .lambda
            .get_function_url_config()
            .function_name(function_name)
            .send()
            .await
        {
            Ok(output) => Ok(Some(output.function_url)),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    return Ok(None);
                }
                Err(api_error("GetFunctionUrlConfig", service_err))
            }
        }
    }

    async fn find_log_group(&self, name: &str) -> Result<Option<Resource>> {
        let output = self
            .logs
            .describe_log_groups()
            .log_group_name_prefix(name)
            .limit(1)
            .send()
            .await
            .map_err(|err| api_error("DescribeLogGroups", err.into_service_error()))?;

        // Prefix query: require the exact name.
        let Some(group) = output
            .log_groups
            .unwrap_or_default()
            .into_iter()
            .find(|group| group.log_group_name.as_deref() == Some(name))
        else {
            return Ok(None);
        };

        let arn = group.arn.unwrap_or_default();

        // Tag lookups on log groups are best effort: a failure leaves the
        // tags empty rather than hiding the group.
        let mut tags = HashMap::new();
        if !arn.is_empty() {
            match self
                .logs
                .list_tags_for_resource()
                .resource_arn(arn.trim_end_matches(":*"))
                .send()
                .await
            {
                Ok(tags_output) => tags = tags_output.tags.unwrap_or_default(),
                Err(err) => {
                    tracing::debug!(error = %iam::error::DisplayErrorContext(err), "log group tag lookup failed");
                }
            }
        }

        Ok(Some(
            Resource::new(group.log_group_name.unwrap_or_default(), arn).with_tags(tags),
        ))
    }

    async fn create_log_group(&self, name: &str, retention_days: i32) -> Result<()> {
        let mut request = self.logs.create_log_group().log_group_name(name);
        for (key, value) in standard_tags() {
            request = request.tags(key, value);
        }
        request
            .send()
            .await
            .map_err(|err| api_error("CreateLogGroup", err.into_service_error()))?;

        self.logs
            .put_retention_policy()
            .log_group_name(name)
            .retention_in_days(retention_days)
            .send()
            .await
            .map_err(|err| api_error("PutRetentionPolicy", err.into_service_error()))?;

        Ok(())
    }

    async fn create_role(&self, name: &str, assume_role_policy: &str) -> Result<String> {
        let mut request = self
            .iam
            .create_role()
            .role_name(name)
            .assume_role_policy_document(assume_role_policy);
        for (key, value) in standard_tags() {
            let tag = iam::types::Tag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(|err| CloudError::api("CreateRole", err.to_string()))?;
            request = request.tags(tag);
        }

        let output = request
            .send()
            .await
            .map_err(|err| api_error("CreateRole", err.into_service_error()))?;

        output
            .role
            .map(|role| role.arn)
            .ok_or_else(|| CloudError::api("CreateRole", "response carried no role"))
    }

    async fn attach_managed_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.iam
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|err| api_error("AttachRolePolicy", err.into_service_error()))?;
        Ok(())
    }

    async fn put_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        document: &str,
    ) -> Result<()> {
        self.iam
            .put_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .policy_document(document)
            .send()
            .await
            .map_err(|err| api_error("PutRolePolicy", err.into_service_error()))?;
        Ok(())
    }

    async fn create_function(&self, spec: &FunctionSpec) -> Result<String> {
        let output = self
            .lambda
            .create_function()
            .function_name(&spec.name)
            .runtime(Runtime::Providedal2023)
            .role(&spec.role_arn)
            .handler("bootstrap")
            .code(
                FunctionCode::builder()
                    .zip_file(Blob::new(spec.archive.clone()))
                    .build(),
            )
            .architectures(Architecture::Arm64)
            .memory_size(256)
            .timeout(60)
            .environment(
                Environment::builder()
                    .set_variables(Some(spec.environment.clone()))
                    .build(),
            )
            .set_tags(Some(standard_tags()))
            .send()
            .await
            .map_err(|err| api_error("CreateFunction", err.into_service_error()))?;

        output
            .function_arn
            .ok_or_else(|| CloudError::api("CreateFunction", "response carried no ARN"))
    }

    async fn create_function_url(&self, function_name: &str) -> Result<String> {
        let output = self
            .lambda
            .create_function_url_config()
            .function_name(function_name)
            .auth_type(FunctionUrlAuthType::None)
            .cors(
                Cors::builder()
                    .allow_credentials(false)
                    .allow_origins("*")
                    .allow_methods("GET")
                    .allow_methods("POST")
                    .allow_methods("DELETE")
                    .allow_headers("date")
                    .allow_headers("keep-alive")
                    .allow_headers("content-type")
                    .allow_headers("authorization")
                    .expose_headers("date")
                    .expose_headers("keep-alive")
                    .max_age(86400)
                    .build(),
            )
            .send()
            .await
            .map_err(|err| api_error("CreateFunctionUrlConfig", err.into_service_error()))?;

        Ok(output.function_url)
    }

    async fn allow_public_invoke(&self, function_name: &str) -> Result<()> {
        self.lambda
            .add_permission()
            .function_name(function_name)
            .statement_id(PUBLIC_INVOKE_STATEMENT_ID)
            .action("lambda:InvokeFunctionUrl")
            .principal("*")
            .function_url_auth_type(FunctionUrlAuthType::None)
            .send()
            .await
            .map_err(|err| api_error("AddPermission", err.into_service_error()))?;
        Ok(())
    }

    async fn delete_function_url(&self, function_name: &str) -> Result<()> {
        self.lambda
            .delete_function_url_config()
            .function_name(function_name)
            .send()
            .await
            .map_err(|err| api_error("DeleteFunctionUrlConfig", err.into_service_error()))?;
        Ok(())
    }

    async fn delete_function(&self, name: &str) -> Result<()> {
        self.lambda
            .delete_function()
            .function_name(name)
            .send()
            .await
            .map_err(|err| api_error("DeleteFunction", err.into_service_error()))?;
        Ok(())
    }

    async fn delete_inline_policy(&self, role_name: &str, policy_name: &str) -> Result<()> {
        self.iam
            .delete_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await
            .map_err(|err| api_error("DeleteRolePolicy", err.into_service_error()))?;
        Ok(())
    }

    async fn detach_managed_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.iam
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|err| api_error("DetachRolePolicy", err.into_service_error()))?;
        Ok(())
    }

    async fn delete_role(&self, name: &str) -> Result<()> {
        self.iam
            .delete_role()
            .role_name(name)
            .send()
            .await
            .map_err(|err| api_error("DeleteRole", err.into_service_error()))?;
        Ok(())
    }

    async fn delete_log_group(&self, name: &str) -> Result<()> {
        self.logs
            .delete_log_group()
            .log_group_name(name)
            .send()
            .await
            .map_err(|err| api_error("DeleteLogGroup", err.into_service_error()))?;
        Ok(())
    }
}
