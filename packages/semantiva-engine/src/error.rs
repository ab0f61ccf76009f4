use thiserror::Error;

/// Engine-level error taxonomy (§7). Wraps the lower layers' errors rather than re-declaring
/// their variants, and adds the ones unique to inspection, execution, and run-space expansion.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),
    #[error(transparent)]
    Registry(#[from] semantiva_registry::RegistryError),
    #[error(transparent)]
    Config(#[from] semantiva_config::ConfigError),
    #[error(transparent)]
    Processor(#[from] semantiva_processors::ProcessorError),
    #[error(transparent)]
    Types(#[from] semantiva_types::TypesError),
    #[error(transparent)]
    Trace(#[from] semantiva_trace::TraceError),
    #[error("data type mismatch: expected {expected}, got {actual}")]
    DataTypeMismatch { expected: String, actual: String },
    #[error("invalid context key: {0}")]
    InvalidContextKey(String),
    #[error("pipeline configuration error at node {node_index}: {reason}")]
    PipelineConfigurationError { node_index: usize, reason: String },
    #[error("run-space expansion produced {actual} runs, exceeding max_runs={max_runs}")]
    RunSpaceTooLarge { actual: usize, max_runs: usize },
    #[error("extension load error: {0:?}")]
    ExtensionLoadError(std::collections::HashMap<String, String>),
    #[error("fan-out/run-space source error: {0}")]
    FanoutSourceError(String),
    #[error("multi_zip columns have mismatched lengths and broadcast is not set: {0:?}")]
    FanoutLengthMismatch(std::collections::BTreeMap<String, usize>),
    #[error("run-space blocks have mismatched row counts under combine=zip: {0:?}")]
    RunSpaceBlockLengthMismatch(Vec<usize>),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::FanoutSourceError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
