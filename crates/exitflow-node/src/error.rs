use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    /// A backend call failed. Carries the operation name for context.
    #[error("{op} failed: {message}")]
    Api { op: &'static str, message: String },

    #[error("no suitable machine image found")]
    NoImageFound,

    #[error("no available zone found for the subnet")]
    NoAvailabilityZone,

    #[error("no tagged subnet found in network {0}")]
    SubnetNotFound(String),

    #[error("user-data template error: {0}")]
    Template(#[from] tera::Error),
}

impl NodeError {
    pub fn api(op: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            op,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;
