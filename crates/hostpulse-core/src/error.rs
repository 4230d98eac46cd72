use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostPulseError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HostPulseError>;
