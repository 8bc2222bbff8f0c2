//! Node lifecycle orchestration
//!
//! Start/list/stop for the ephemeral family, plus the two cleanup paths:
//! the delayed best-effort network teardown after a stop, and the forced
//! cleanup that re-deletes every tagged resource for manual recovery.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::backend::{LaunchSpec, NodeBackend};
use crate::error::Result;
use crate::user_data;
use crate::{ACTIVE_STATES, TERMINATABLE_STATES};
use exitflow_core::NodeInfo;

/// Grace delay before the post-stop network cleanup re-checks the region.
const DEFAULT_CLEANUP_GRACE: Duration = Duration::from_secs(30);

/// Settle delay between terminating instances and deleting their security
/// groups during forced cleanup.
const FORCE_CLEANUP_SETTLE: Duration = Duration::from_secs(5);

pub struct NodeLifecycle<B> {
    backend: Arc<B>,
    region: String,
    cleanup_grace: Duration,
}

impl<B> NodeLifecycle<B>
where
    B: NodeBackend + 'static,
{
    /// `region` is the friendly name; the backend is already scoped to the
    /// matching provider region.
    pub fn new(backend: Arc<B>, region: impl Into<String>) -> Self {
        Self {
            backend,
            region: region.into(),
            cleanup_grace: DEFAULT_CLEANUP_GRACE,
        }
    }

    pub fn with_cleanup_grace(mut self, grace: Duration) -> Self {
        self.cleanup_grace = grace;
        self
    }

    /// Launch one exit node, finding or creating the network stack and
    /// security group it needs.
    pub async fn start(&self, auth_key: &str) -> Result<NodeInfo> {
        let image_id = self.backend.latest_image().await?;

        let network = match self.backend.find_network(&self.region).await? {
            Some(network) => network,
            None => {
                tracing::info!(region = %self.region, "no network stack found, creating");
                self.backend.create_network(&self.region).await?
            }
        };

        let security_group_id = match self
            .backend
            .find_security_group(&network.vpc_id, &self.region)
            .await?
        {
            Some(id) => id,
            None => {
                self.backend
                    .create_security_group(&network.vpc_id, &self.region)
                    .await?
            }
        };

        let spec = LaunchSpec {
            region: self.region.clone(),
            image_id,
            subnet_id: network.subnet_id,
            security_group_id,
            user_data: user_data::render(auth_key, &self.region)?,
        };

        self.backend.launch_node(&spec).await
    }

    pub async fn list(&self) -> Result<Vec<NodeInfo>> {
        self.backend.list_nodes().await
    }

    /// Terminate every tagged instance that still occupies capacity and
    /// return the terminated IDs immediately. Network cleanup happens
    /// later on a detached task — see [`Self::spawn_delayed_cleanup`].
    pub async fn stop(&self) -> Result<Vec<String>> {
        let nodes = self.backend.list_nodes().await?;

        let instance_ids: Vec<String> = nodes
            .iter()
            .filter(|node| TERMINATABLE_STATES.contains(&node.state.as_str()))
            .map(|node| node.instance_id.clone())
            .collect();

        if instance_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.backend.terminate_nodes(&instance_ids).await?;
        self.spawn_delayed_cleanup();

        Ok(instance_ids)
    }

    /// Spawn the post-stop cleanup: wait out the grace delay, then delete
    /// the tagged network stacks if no instance remains active.
    ///
    /// Detached by design — there is no cancellation hook, failures are
    /// logged and never surfaced, and if the process exits before the
    /// delay elapses the task simply never runs. Correctness cannot depend
    /// on it: orphans are recovered through [`Self::force_cleanup`].
    pub fn spawn_delayed_cleanup(&self) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let grace = self.cleanup_grace;
        let region = self.region.clone();

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(err) = cleanup_networks(backend.as_ref()).await {
                tracing::warn!(region = %region, error = %err, "delayed network cleanup failed");
            }
        })
    }

    /// Aggressively re-delete every tagged resource in the region,
    /// regardless of instance state. Individual failures are logged and
    /// skipped. Returns labels of what was cleaned, for reporting.
    pub async fn force_cleanup(&self) -> Result<Vec<String>> {
        let mut cleaned = Vec::new();

        // 1. Terminate anything still occupying capacity.
        if let Ok(nodes) = self.backend.list_nodes().await {
            for node in nodes {
                if !TERMINATABLE_STATES.contains(&node.state.as_str()) {
                    continue;
                }
                match self
                    .backend
                    .terminate_nodes(std::slice::from_ref(&node.instance_id))
                    .await
                {
                    Ok(()) => cleaned.push(format!("Instance:{}", node.instance_id)),
                    Err(err) => {
                        tracing::warn!(instance = %node.instance_id, error = %err, "terminate failed")
                    }
                }
            }
        }

        // Give terminations a moment to register before touching the
        // resources they reference.
        tokio::time::sleep(FORCE_CLEANUP_SETTLE).await;

        // 2. Security groups.
        if let Ok(group_ids) = self.backend.list_security_group_ids(&self.region).await {
            for group_id in group_ids {
                match self.backend.delete_security_group(&group_id).await {
                    Ok(()) => cleaned.push(format!("SecurityGroup:{group_id}")),
                    Err(err) => {
                        tracing::warn!(group = %group_id, error = %err, "security group delete failed")
                    }
                }
            }
        }

        // 3. Network stacks.
        if let Ok(vpc_ids) = self.backend.list_network_ids().await {
            for vpc_id in vpc_ids {
                match self.backend.delete_network(&vpc_id).await {
                    Ok(()) => cleaned.push(format!("VPC:{vpc_id}")),
                    Err(err) => {
                        tracing::warn!(vpc = %vpc_id, error = %err, "network delete failed")
                    }
                }
            }
        }

        Ok(cleaned)
    }
}

/// Delete every tagged network stack, but only when no tagged instance is
/// still running or pending.
pub async fn cleanup_networks<B>(backend: &B) -> Result<()>
where
    B: NodeBackend + ?Sized,
{
    let nodes = backend.list_nodes().await?;
    if nodes
        .iter()
        .any(|node| ACTIVE_STATES.contains(&node.state.as_str()))
    {
        tracing::debug!("instances still active, skipping network cleanup");
        return Ok(());
    }

    for vpc_id in backend.list_network_ids().await? {
        if let Err(err) = backend.delete_network(&vpc_id).await {
            tracing::warn!(vpc = %vpc_id, error = %err, "network delete failed, continuing");
        }
    }

    Ok(())
}
