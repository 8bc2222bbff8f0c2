//! In-memory provider for engine tests
//!
//! Behaves like a tiny cloud account: lookups reflect what has been seeded
//! or created, create/delete calls mutate it, and every call is counted so
//! tests can assert on exactly which operations ran.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{CloudError, Result};
use crate::provider::{ControlPlaneProvider, FunctionSpec, InlinePolicy};
use crate::state::Resource;
use crate::{MANAGED_POLICY_ARN, standard_tags};

/// The error message the provider emits while a new role is still
/// propagating.
pub const PROPAGATION_MESSAGE: &str =
    "InvalidParameterValueException: The role defined for the function cannot be assumed by Lambda.";

#[derive(Default)]
struct Account {
    role: Option<Resource>,
    managed_attached: bool,
    inline: Option<InlinePolicy>,
    function: Option<Resource>,
    function_url: Option<String>,
    log_group: Option<Resource>,
    public_invoke: bool,
}

#[derive(Default)]
pub struct MockProvider {
    account: Mutex<Account>,
    create_calls: AtomicUsize,
    create_function_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    /// Remaining induced create-function failures and their message.
    function_failures: Mutex<Option<(usize, String)>>,
    /// Operation names whose delete calls should fail.
    failing_deletes: Mutex<Vec<&'static str>>,
}

impl MockProvider {
    /// A provider with every control-plane resource already deployed and
    /// tagged.
    pub fn complete() -> Self {
        let provider = Self::default();
        {
            let mut account = provider.account.lock().unwrap();
            account.role = Some(
                Resource::new("exitflow-nodes-lambda-role", "arn:aws:iam::1:role/exitflow")
                    .with_tags(standard_tags()),
            );
            account.managed_attached = true;
            account.inline = Some(InlinePolicy {
                name: "exitflow-nodes-lambda-ec2-policy".to_string(),
                document: "{}".to_string(),
            });
            account.function = Some(
                Resource::new(
                    "exitflow-nodes",
                    "arn:aws:lambda:us-east-2:1:function:exitflow-nodes",
                )
                .with_tags(standard_tags()),
            );
            account.function_url =
                Some("https://abc123.lambda-url.us-east-2.on.aws/".to_string());
            account.log_group = Some(
                Resource::new("/aws/lambda/exitflow-nodes", "arn:aws:logs:1:log-group")
                    .with_tags(standard_tags()),
            );
            account.public_invoke = true;
        }
        provider
    }

    pub fn seed_role(&self, arn: &str) {
        self.account.lock().unwrap().role =
            Some(Resource::new("exitflow-nodes-lambda-role", arn).with_tags(standard_tags()));
    }

    pub fn seed_untagged_role(&self) {
        self.account.lock().unwrap().role =
            Some(Resource::new("exitflow-nodes-lambda-role", "arn:role"));
    }

    pub fn seed_managed_policy(&self) {
        self.account.lock().unwrap().managed_attached = true;
    }

    pub fn fail_function_creates(&self, message: impl Into<String>, count: usize) {
        *self.function_failures.lock().unwrap() = Some((count, message.into()));
    }

    pub fn fail_delete(&self, op: &'static str) {
        self.failing_deletes.lock().unwrap().push(op);
    }

    /// All create calls, function creation included.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn create_function_calls(&self) -> usize {
        self.create_function_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn public_invoke_allowed(&self) -> bool {
        self.account.lock().unwrap().public_invoke
    }

    fn check_delete(&self, op: &'static str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.lock().unwrap().contains(&op) {
            return Err(CloudError::api(op, "DependencyViolation: still in use"));
        }
        Ok(())
    }
}

#[async_trait]
impl ControlPlaneProvider for MockProvider {
    async fn get_role(&self, _name: &str) -> Result<Option<Resource>> {
        Ok(self.account.lock().unwrap().role.clone())
    }

    async fn list_attached_policy_arns(&self, _role_name: &str) -> Result<Vec<String>> {
        let attached = self.account.lock().unwrap().managed_attached;
        Ok(if attached {
            vec![MANAGED_POLICY_ARN.to_string()]
        } else {
            Vec::new()
        })
    }

    async fn get_inline_policy(
        &self,
        _role_name: &str,
        _policy_name: &str,
    ) -> Result<Option<InlinePolicy>> {
        Ok(self.account.lock().unwrap().inline.clone())
    }

    async fn get_function(&self, _name: &str) -> Result<Option<Resource>> {
        Ok(self.account.lock().unwrap().function.clone())
    }

    async fn get_function_url(&self, _function_name: &str) -> Result<Option<String>> {
        Ok(self.account.lock().unwrap().function_url.clone())
    }

    async fn find_log_group(&self, _name: &str) -> Result<Option<Resource>> {
        Ok(self.account.lock().unwrap().log_group.clone())
    }

    async fn create_log_group(&self, name: &str, _retention_days: i32) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.account.lock().unwrap().log_group =
            Some(Resource::new(name, "arn:log").with_tags(standard_tags()));
        Ok(())
    }

    async fn create_role(&self, name: &str, _assume_role_policy: &str) -> Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let arn = format!("arn:aws:iam::123456789012:role/{name}");
        self.account.lock().unwrap().role =
            Some(Resource::new(name, &arn).with_tags(standard_tags()));
        Ok(arn)
    }

    async fn attach_managed_policy(&self, _role_name: &str, _policy_arn: &str) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.account.lock().unwrap().managed_attached = true;
        Ok(())
    }

    async fn put_inline_policy(
        &self,
        _role_name: &str,
        policy_name: &str,
        document: &str,
    ) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.account.lock().unwrap().inline = Some(InlinePolicy {
            name: policy_name.to_string(),
            document: document.to_string(),
        });
        Ok(())
    }

    async fn create_function(&self, spec: &FunctionSpec) -> Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_function_calls.fetch_add(1, Ordering::SeqCst);

        let mut failures = self.function_failures.lock().unwrap();
        if let Some((remaining, message)) = failures.as_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CloudError::api("CreateFunction", message.clone()));
            }
        }
        drop(failures);

        let arn = format!("arn:aws:lambda:us-east-2:123456789012:function:{}", spec.name);
        self.account.lock().unwrap().function =
            Some(Resource::new(&spec.name, &arn).with_tags(standard_tags()));
        Ok(arn)
    }

    async fn create_function_url(&self, _function_name: &str) -> Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let url = "https://abc123.lambda-url.us-east-2.on.aws/".to_string();
        self.account.lock().unwrap().function_url = Some(url.clone());
        Ok(url)
    }

    async fn allow_public_invoke(&self, _function_name: &str) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.account.lock().unwrap().public_invoke = true;
        Ok(())
    }

    async fn delete_function_url(&self, _function_name: &str) -> Result<()> {
        self.check_delete("DeleteFunctionUrlConfig")?;
        self.account.lock().unwrap().function_url = None;
        Ok(())
    }

    async fn delete_function(&self, _name: &str) -> Result<()> {
        self.check_delete("DeleteFunction")?;
        self.account.lock().unwrap().function = None;
        Ok(())
    }

    async fn delete_inline_policy(&self, _role_name: &str, _policy_name: &str) -> Result<()> {
        self.check_delete("DeleteRolePolicy")?;
        self.account.lock().unwrap().inline = None;
        Ok(())
    }

    async fn detach_managed_policy(&self, _role_name: &str, _policy_arn: &str) -> Result<()> {
        self.check_delete("DetachRolePolicy")?;
        self.account.lock().unwrap().managed_attached = false;
        Ok(())
    }

    async fn delete_role(&self, _name: &str) -> Result<()> {
        self.check_delete("DeleteRole")?;
        self.account.lock().unwrap().role = None;
        Ok(())
    }

    async fn delete_log_group(&self, _name: &str) -> Result<()> {
        self.check_delete("DeleteLogGroup")?;
        self.account.lock().unwrap().log_group = None;
        Ok(())
    }
}
