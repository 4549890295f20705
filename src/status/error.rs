use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid job id: {0:?}")]
    InvalidId(String),
}

pub type Result<T> = std::result::Result<T, StatusError>;
