//! Control API wire types
//!
//! JSON envelopes exchanged between the CLI and the deployed control API.
//! Kept provider-neutral: the agent fills them from whatever backend it
//! runs against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single exit-node instance as reported by the control API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    pub friendly_region: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    pub launch_time: DateTime<Utc>,
    pub instance_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tailscale_hostname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
    pub terminated_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terminated_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesResponse {
    pub success: bool,
    pub message: String,
    pub nodes: Vec<NodeInfo>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl ErrorResponse {
    pub fn new(code: u16, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: Some(code),
        }
    }
}
