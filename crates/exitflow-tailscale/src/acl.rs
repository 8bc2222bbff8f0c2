//! ACL policy model and merge operations
//!
//! The policy is treated as a document we merge into, never rewrite:
//! every operation adds the minimum it needs and leaves existing entries
//! alone — in particular an existing `tag:exitnode` owner list is never
//! modified, whatever it contains.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::EXIT_NODE_TAG;
use crate::error::{Result, TailscaleError};

/// A Tailscale ACL policy. Only the sections we read or edit are modeled
/// strongly; everything else rides along in `extra` so a round-trip never
/// drops unknown sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AclPolicy {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub groups: HashMap<String, Vec<String>>,

    #[serde(rename = "tagOwners", default, skip_serializing_if = "HashMap::is_empty")]
    pub tag_owners: HashMap<String, Vec<String>>,

    #[serde(rename = "autoApprovers", default, skip_serializing_if = "Option::is_none")]
    pub auto_approvers: Option<AutoApprovers>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acls: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub hosts: HashMap<String, String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoApprovers {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub routes: HashMap<String, Vec<String>>,

    #[serde(rename = "exitNode", default, skip_serializing_if = "Vec::is_empty")]
    pub exit_node: Vec<String>,
}

/// A fetched policy together with the ETag needed for a safe write-back.
#[derive(Debug, Clone)]
pub struct AclResponse {
    pub policy: AclPolicy,
    pub etag: String,
}

/// Add `tag` to `tagOwners` with the given owner if the tag is not present.
/// Returns true if the policy was modified. A tag that already exists is
/// left untouched even when its owner list differs.
pub fn ensure_tag_owner(policy: &mut AclPolicy, tag: &str, owner: &str) -> bool {
    if policy.tag_owners.contains_key(tag) {
        return false;
    }
    policy
        .tag_owners
        .insert(tag.to_string(), vec![owner.to_string()]);
    true
}

/// Add `tag` to the exit-node auto-approvers if not present. Returns true
/// if the policy was modified.
pub fn ensure_auto_approver(policy: &mut AclPolicy, tag: &str) -> bool {
    let approvers = policy.auto_approvers.get_or_insert_with(AutoApprovers::default);
    if approvers.exit_node.iter().any(|entry| entry == tag) {
        return false;
    }
    approvers.exit_node.push(tag.to_string());
    true
}

pub fn has_tag_owner(policy: &AclPolicy, tag: &str) -> bool {
    policy.tag_owners.contains_key(tag)
}

pub fn has_auto_approver(policy: &AclPolicy, tag: &str) -> bool {
    policy
        .auto_approvers
        .as_ref()
        .is_some_and(|approvers| approvers.exit_node.iter().any(|entry| entry == tag))
}

/// Configure the policy for exit nodes. Returns human-readable change
/// descriptions and whether anything was modified.
pub fn configure_for_exit_nodes(policy: &mut AclPolicy, owner: &str) -> (Vec<String>, bool) {
    let mut changes = Vec::new();
    let mut modified = false;

    if ensure_tag_owner(policy, EXIT_NODE_TAG, owner) {
        changes.push(format!("Added {EXIT_NODE_TAG} to tagOwners (owner: {owner})"));
        modified = true;
    } else if let Some(owners) = policy.tag_owners.get(EXIT_NODE_TAG) {
        changes.push(format!(
            "{EXIT_NODE_TAG} already in tagOwners (owners: {})",
            owners.join(", ")
        ));
    }

    if ensure_auto_approver(policy, EXIT_NODE_TAG) {
        changes.push(format!("Added {EXIT_NODE_TAG} to exit node auto-approvers"));
        modified = true;
    } else {
        changes.push(format!("{EXIT_NODE_TAG} already in exit node auto-approvers"));
    }

    (changes, modified)
}

/// Human-readable description of what `configure_for_exit_nodes` would do.
pub fn preview_changes(policy: &AclPolicy, owner: &str) -> Vec<String> {
    let mut preview = Vec::new();

    if has_tag_owner(policy, EXIT_NODE_TAG) {
        let owners = policy
            .tag_owners
            .get(EXIT_NODE_TAG)
            .map(|owners| owners.join(", "))
            .unwrap_or_default();
        preview.push(format!(
            "  {EXIT_NODE_TAG} already exists in tagOwners (owners: {owners})"
        ));
    } else {
        preview.push(format!(
            "+ Add {EXIT_NODE_TAG} to tagOwners with owner: {owner}"
        ));
    }

    if has_auto_approver(policy, EXIT_NODE_TAG) {
        preview.push(format!("  {EXIT_NODE_TAG} already in exit node auto-approvers"));
    } else {
        preview.push(format!("+ Add {EXIT_NODE_TAG} to exit node auto-approvers"));
    }

    preview
}

/// Check that the policy is fully configured for exit nodes.
pub fn validate_exit_node_config(policy: &AclPolicy) -> Result<()> {
    let mut missing = Vec::new();

    if !has_tag_owner(policy, EXIT_NODE_TAG) {
        missing.push(format!("{EXIT_NODE_TAG} not in tagOwners"));
    }
    if !has_auto_approver(policy, EXIT_NODE_TAG) {
        missing.push(format!("{EXIT_NODE_TAG} not in exit node auto-approvers"));
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TailscaleError::AclValidation(missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_tag_owner_when_absent() {
        let mut policy = AclPolicy::default();
        assert!(ensure_tag_owner(&mut policy, EXIT_NODE_TAG, "autogroup:admin"));
        assert_eq!(
            policy.tag_owners[EXIT_NODE_TAG],
            vec!["autogroup:admin".to_string()]
        );
    }

    #[test]
    fn does_not_duplicate_or_rewrite_existing_owners() {
        let mut policy = AclPolicy::default();
        policy.tag_owners.insert(
            EXIT_NODE_TAG.to_string(),
            vec!["alice@example.com".to_string()],
        );

        // Present with a different owner: leave alone.
        assert!(!ensure_tag_owner(&mut policy, EXIT_NODE_TAG, "autogroup:admin"));
        assert_eq!(
            policy.tag_owners[EXIT_NODE_TAG],
            vec!["alice@example.com".to_string()]
        );

        // Present with the same owner: still no change.
        assert!(!ensure_tag_owner(&mut policy, EXIT_NODE_TAG, "alice@example.com"));
    }

    #[test]
    fn adds_auto_approver_once() {
        let mut policy = AclPolicy::default();
        assert!(ensure_auto_approver(&mut policy, EXIT_NODE_TAG));
        assert!(!ensure_auto_approver(&mut policy, EXIT_NODE_TAG));
        assert_eq!(
            policy.auto_approvers.unwrap().exit_node,
            vec![EXIT_NODE_TAG.to_string()]
        );
    }

    #[test]
    fn keeps_existing_approvers() {
        let mut policy = AclPolicy {
            auto_approvers: Some(AutoApprovers {
                exit_node: vec!["tag:relay".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(ensure_auto_approver(&mut policy, EXIT_NODE_TAG));
        assert_eq!(
            policy.auto_approvers.unwrap().exit_node,
            vec!["tag:relay".to_string(), EXIT_NODE_TAG.to_string()]
        );
    }

    #[test]
    fn configure_reports_changes_and_idempotence() {
        let mut policy = AclPolicy::default();

        let (changes, modified) = configure_for_exit_nodes(&mut policy, "autogroup:admin");
        assert!(modified);
        assert_eq!(changes.len(), 2);

        let (changes, modified) = configure_for_exit_nodes(&mut policy, "autogroup:admin");
        assert!(!modified);
        assert!(changes.iter().all(|change| change.contains("already")));
    }

    #[test]
    fn validation_names_whats_missing() {
        let err = validate_exit_node_config(&AclPolicy::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tagOwners"));
        assert!(message.contains("auto-approvers"));

        let mut policy = AclPolicy::default();
        configure_for_exit_nodes(&mut policy, "autogroup:admin");
        validate_exit_node_config(&policy).unwrap();
    }

    #[test]
    fn unknown_policy_sections_survive_a_round_trip() {
        let raw = r#"{
            "tagOwners": {"tag:web": ["group:eng"]},
            "ssh": [{"action": "accept", "src": ["autogroup:member"]}],
            "tests": [{"src": "tag:web"}]
        }"#;

        let mut policy: AclPolicy = serde_json::from_str(raw).unwrap();
        ensure_tag_owner(&mut policy, EXIT_NODE_TAG, "autogroup:admin");

        let round_tripped = serde_json::to_value(&policy).unwrap();
        assert!(round_tripped.get("ssh").is_some());
        assert!(round_tripped.get("tests").is_some());
        assert!(round_tripped["tagOwners"].get("tag:web").is_some());
    }
}
