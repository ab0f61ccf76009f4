use thiserror::Error;

/// Failures raised while invoking a processor or routing values through a node (§4.B, §4.C).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("processor expected input type '{expected}', got '{actual}'")]
    InputTypeMismatch { expected: String, actual: String },

    #[error("processor produced output type '{actual}', declared output type is '{expected}'")]
    OutputTypeMismatch { expected: String, actual: String },

    #[error("context key '{0}' is not writable from this processor")]
    InvalidContextKey(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
