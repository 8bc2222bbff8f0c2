//! Reconciliation engine error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    /// A provider call failed for any reason other than "not found".
    /// Carries the operation name so the failure surfaces with context.
    #[error("{op} failed: {message}")]
    Api { op: &'static str, message: String },

    /// The execution role never became assumable within the retry window.
    #[error("timed out after {0:?} waiting for the execution role to become assumable")]
    PropagationTimeout(Duration),

    /// A required secret was not provided. User-actionable, never retried.
    #[error("{name} is not set{hint}")]
    MissingSecret { name: &'static str, hint: String },

    /// The destructive-action confirmation token did not match.
    #[error("confirmation token mismatch — teardown aborted, nothing was deleted")]
    ConfirmationMismatch,

    /// Building the function deployment artifact failed. Distinct from
    /// provider-call failures so callers can tell toolchain problems apart.
    #[error("failed to package function artifact: {0}")]
    Packaging(String),
}

impl CloudError {
    pub fn api(op: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            op,
            message: message.into(),
        }
    }

    pub fn missing_secret(name: &'static str, hint: impl Into<String>) -> Self {
        Self::MissingSecret {
            name,
            hint: hint.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
