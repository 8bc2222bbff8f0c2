//! Tailscale API client for ExitFlow
//!
//! Automates the tailnet side of the deployment: making `tag:exitnode`
//! usable (tag owners + exit-node auto-approval in the ACL policy) and
//! minting the reusable ephemeral auth key baked into the control
//! function. The ACL edits are pure merge operations over the policy
//! document — fetch with ETag, merge, write back with `If-Match`.

pub mod acl;
pub mod authkey;
pub mod client;
pub mod error;

pub use acl::{
    AclPolicy, AclResponse, AutoApprovers, configure_for_exit_nodes, ensure_auto_approver,
    ensure_tag_owner, has_auto_approver, has_tag_owner, preview_changes,
    validate_exit_node_config,
};
pub use authkey::{AuthKeyRequest, AuthKeyResponse, exit_node_auth_key_request};
pub use client::Client;
pub use error::{Result, TailscaleError};

/// The tag every exit node advertises under.
pub const EXIT_NODE_TAG: &str = "tag:exitnode";
