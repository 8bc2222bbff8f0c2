//! ExitFlow ephemeral exit-node lifecycle
//!
//! The second, independently-keyed resource family: one network stack plus
//! zero-or-more instances per region, created only while an exit node is
//! active. Follows the same discover/create/delete shape as the control
//! plane — find-or-create by tags, terminate by tags, no state file — with
//! one twist: after instances are terminated, the network stack is cleaned
//! up by a detached background task after a grace delay. That task is best
//! effort by design (the process may exit first); [`force cleanup`]
//! (`NodeLifecycle::force_cleanup`) is the recovery path for anything it
//! leaves behind.

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod user_data;

pub use backend::{LaunchSpec, Network, NodeBackend};
pub use error::{NodeError, Result};
pub use lifecycle::{NodeLifecycle, cleanup_networks};

/// ARM instance type, chosen for cost.
pub const INSTANCE_TYPE: &str = "t4g.nano";

/// Tags keying every ephemeral resource.
pub const TAG_PROJECT_KEY: &str = "Project";
pub const TAG_PROJECT_VALUE: &str = "exitflow";
pub const TAG_TYPE_KEY: &str = "Type";
pub const TAG_TYPE_VALUE: &str = "ephemeral";
pub const TAG_REGION_KEY: &str = "Region";

/// Instance states that still occupy capacity and should be terminated on
/// stop.
pub const TERMINATABLE_STATES: [&str; 3] = ["running", "pending", "stopped"];

/// Instance states that block network-stack cleanup.
pub const ACTIVE_STATES: [&str; 2] = ["running", "pending"];
