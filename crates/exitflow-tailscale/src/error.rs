use thiserror::Error;

#[derive(Error, Debug)]
pub enum TailscaleError {
    #[error("API token is required")]
    MissingToken,

    #[error("tailnet name is required (pass --tailnet; find yours with: tailscale status)")]
    MissingTailnet,

    #[error("Tailscale API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("ACL validation failed: {0}")]
    AclValidation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TailscaleError {
    /// ETag conflict: the ACL changed between fetch and write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 412, .. })
    }

    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

pub type Result<T> = std::result::Result<T, TailscaleError>;
