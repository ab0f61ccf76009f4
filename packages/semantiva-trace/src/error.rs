use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace driver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize trace record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
