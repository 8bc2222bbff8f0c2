//! Auth key types

use serde::{Deserialize, Serialize};

use crate::EXIT_NODE_TAG;

#[derive(Debug, Clone, Serialize)]
pub struct AuthKeyRequest {
    pub capabilities: Capabilities,
    #[serde(rename = "expirySeconds")]
    pub expiry_seconds: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub devices: DeviceCapabilities,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceCapabilities {
    pub create: DeviceCreate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceCreate {
    pub reusable: bool,
    pub ephemeral: bool,
    pub tags: Vec<String>,
    pub preauthorized: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthKeyResponse {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub description: String,
}

/// The key configuration exit nodes need: reusable (every node uses the
/// same key), ephemeral (nodes vanish from the tailnet when terminated),
/// pre-authorized and tagged.
pub fn exit_node_auth_key_request() -> AuthKeyRequest {
    AuthKeyRequest {
        capabilities: Capabilities {
            devices: DeviceCapabilities {
                create: DeviceCreate {
                    reusable: true,
                    ephemeral: true,
                    tags: vec![EXIT_NODE_TAG.to_string()],
                    preauthorized: true,
                },
            },
        },
        // Never expires.
        expiry_seconds: 0,
        description: "ExitFlow ephemeral exit node auth key".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_node_request_shape() {
        let request = exit_node_auth_key_request();
        let json = serde_json::to_value(&request).unwrap();

        let create = &json["capabilities"]["devices"]["create"];
        assert_eq!(create["reusable"], true);
        assert_eq!(create["ephemeral"], true);
        assert_eq!(create["preauthorized"], true);
        assert_eq!(create["tags"][0], EXIT_NODE_TAG);
        assert_eq!(json["expirySeconds"], 0);
    }
}
