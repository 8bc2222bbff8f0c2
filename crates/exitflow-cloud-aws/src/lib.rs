//! AWS provider for ExitFlow
//!
//! Concrete implementations of the two provider traits:
//! [`exitflow_cloud::ControlPlaneProvider`] over IAM, Lambda and CloudWatch
//! Logs, and [`exitflow_node::NodeBackend`] over EC2. Clients are created
//! once per region entry point and reused.
//!
//! Error convention: lookups translate the service's not-found errors into
//! `Ok(None)`; every other failure is stringified with its full error
//! context (exception name included — the propagation-delay classifier
//! matches on it) and wrapped with the operation name.

mod control_plane;
mod ec2;

pub use control_plane::AwsControlPlane;
pub use ec2::AwsNodeBackend;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Load the shared AWS config for a region (credentials from the default
/// provider chain).
pub async fn load_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}
