//! Node backend trait
//!
//! The boundary between the lifecycle orchestration and a concrete compute
//! provider. All lookups are keyed by the ephemeral tag set
//! (`Project`/`Type`/`Region`); "nothing found" is `Ok(None)` or an empty
//! list, never an error.

use async_trait::async_trait;

use crate::error::Result;
use exitflow_core::NodeInfo;

/// The per-region network stack an instance launches into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub vpc_id: String,
    pub subnet_id: String,
}

/// Everything needed to launch one exit-node instance.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Friendly region name, used for tags and the node hostname.
    pub region: String,
    pub image_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
    /// Base64-encoded boot script.
    pub user_data: String,
}

/// Compute provider abstraction for the ephemeral family.
#[async_trait]
pub trait NodeBackend: Send + Sync {
    /// Find the tagged network stack for a region.
    async fn find_network(&self, region: &str) -> Result<Option<Network>>;

    /// Create the full network stack for a region: network, subnet in the
    /// first available zone, internet gateway, default route, public IPs
    /// on launch.
    async fn create_network(&self, region: &str) -> Result<Network>;

    async fn find_security_group(&self, vpc_id: &str, region: &str) -> Result<Option<String>>;

    /// Create the tagged security group with the exit-node ingress rules
    /// (WireGuard UDP 41641, SSH 22).
    async fn create_security_group(&self, vpc_id: &str, region: &str) -> Result<String>;

    /// Identifier of the latest suitable machine image.
    async fn latest_image(&self) -> Result<String>;

    async fn launch_node(&self, spec: &LaunchSpec) -> Result<NodeInfo>;

    /// All tagged instances in the region, whatever their state.
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>>;

    async fn terminate_nodes(&self, instance_ids: &[String]) -> Result<()>;

    /// IDs of all tagged network stacks in the region.
    async fn list_network_ids(&self) -> Result<Vec<String>>;

    /// Delete one network stack and everything hanging off it (gateway,
    /// subnets, then the network itself).
    async fn delete_network(&self, vpc_id: &str) -> Result<()>;

    async fn list_security_group_ids(&self, region: &str) -> Result<Vec<String>>;

    async fn delete_security_group(&self, group_id: &str) -> Result<()>;
}
