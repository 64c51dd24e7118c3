use thiserror::Error;

pub type Result<T, E = SessionLogError> = std::result::Result<T, E>;

/// Unified error type covering the failure classes of the telemetry pipeline.
#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
