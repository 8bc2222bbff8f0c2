//! Discovered control-plane state
//!
//! A [`ControlPlaneState`] is a snapshot of what discovery observed at one
//! point in time. It is recomputed wholesale on every pass — never patched
//! in place — and the derived predicates are pure functions of it.

use std::collections::HashMap;

use crate::{MANAGED_BY_TAG_KEY, MANAGED_BY_TAG_VALUE};

/// One concrete provider object: name, provider-assigned identifier and tags.
/// Resources that share this shape (role, function, log group) all use it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub arn: String,
    pub tags: HashMap<String, String>,
}

impl Resource {
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            tags: HashMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Whether this resource carries the expected ownership tag.
    pub fn is_owned(&self) -> bool {
        self.tags
            .get(MANAGED_BY_TAG_KEY)
            .is_some_and(|value| value == MANAGED_BY_TAG_VALUE)
    }
}

/// Role policy attachments as discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyState {
    /// Whether the managed execution policy is attached.
    pub managed_attached: bool,
    pub inline_name: Option<String>,
    pub inline_document: Option<String>,
}

/// Snapshot of the control plane. Absence means discovery did not find the
/// resource — a normal outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlPlaneState {
    pub log_group: Option<Resource>,
    pub role: Option<Resource>,
    pub function: Option<Resource>,
    pub function_url: Option<String>,
    pub policies: PolicyState,
}

/// The closed set of control-plane resources, in canonical order. Doubles
/// as the key for missing-resource reporting and deletion reports, so tests
/// and callers never match on display prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    LogGroup,
    Role,
    ManagedPolicyAttachment,
    InlinePolicy,
    Function,
    FunctionUrl,
}

impl ResourceKind {
    /// Every kind, in the canonical reporting order.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::LogGroup,
        ResourceKind::Role,
        ResourceKind::ManagedPolicyAttachment,
        ResourceKind::InlinePolicy,
        ResourceKind::Function,
        ResourceKind::FunctionUrl,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::LogGroup => "CloudWatch Log Group",
            ResourceKind::Role => "IAM Role",
            ResourceKind::ManagedPolicyAttachment => "Managed Policy Attachment",
            ResourceKind::InlinePolicy => "Inline Policy",
            ResourceKind::Function => "Lambda Function",
            ResourceKind::FunctionUrl => "Function URL",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl ControlPlaneState {
    /// True if at least one control-plane resource was found.
    pub fn exists(&self) -> bool {
        self.log_group.is_some() || self.role.is_some() || self.function.is_some()
    }

    /// True if every required resource is deployed.
    pub fn is_complete(&self) -> bool {
        self.log_group.is_some()
            && self.role.is_some()
            && self.function.is_some()
            && self.function_url.as_deref().is_some_and(|url| !url.is_empty())
            && self.policies.managed_attached
            && self.policies.inline_name.as_deref().is_some_and(|name| !name.is_empty())
    }

    /// Whether a given resource is present in this snapshot.
    pub fn has(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::LogGroup => self.log_group.is_some(),
            ResourceKind::Role => self.role.is_some(),
            ResourceKind::ManagedPolicyAttachment => self.policies.managed_attached,
            ResourceKind::InlinePolicy => self
                .policies
                .inline_name
                .as_deref()
                .is_some_and(|name| !name.is_empty()),
            ResourceKind::Function => self.function.is_some(),
            ResourceKind::FunctionUrl => self
                .function_url
                .as_deref()
                .is_some_and(|url| !url.is_empty()),
        }
    }

    /// Resources not yet deployed, in canonical order.
    pub fn missing(&self) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| !self.has(*kind))
            .collect()
    }

    /// True if global (IAM) resources exist but no regional resource does.
    /// Usually means the caller is querying the wrong region: IAM is global,
    /// the log group / function / URL are not.
    pub fn has_only_global_resources(&self) -> bool {
        let has_global = self.role.is_some()
            || self.policies.managed_attached
            || self
                .policies
                .inline_name
                .as_deref()
                .is_some_and(|name| !name.is_empty());
        let has_regional = self.log_group.is_some()
            || self.function.is_some()
            || self
                .function_url
                .as_deref()
                .is_some_and(|url| !url.is_empty());
        has_global && !has_regional
    }
}
