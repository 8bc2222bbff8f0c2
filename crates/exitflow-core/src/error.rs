use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown region '{name}'. Available regions: {available}")]
    UnknownRegion { name: String, available: String },

    #[error("unknown AWS region '{0}'")]
    UnknownAwsRegion(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
