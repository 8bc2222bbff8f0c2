//! ExitFlow core types
//!
//! Shared building blocks for the ExitFlow CLI, control API and cloud
//! crates: the friendly-name region table and the JSON wire types spoken
//! between the CLI and the deployed control API.

pub mod api;
pub mod error;
pub mod region;

pub use api::{
    ErrorResponse, HealthResponse, NodeInfo, NodesResponse, StartResponse, StopResponse,
};
pub use error::{CoreError, Result};
pub use region::Region;
