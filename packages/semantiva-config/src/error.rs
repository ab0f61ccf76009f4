use thiserror::Error;

/// Failures raised while preprocessing a node's configuration or resolving one of its runtime
/// parameters (§4.F, §4.G).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("unknown configuration parameter '{0}'")]
    UnknownParameter(String),

    #[error("invalid parametric_sweep directive: {0}")]
    InvalidSweepDirective(String),

    #[error("context key '{0}' required by the sweep is missing or not a non-empty sequence")]
    InvalidSweepContextValue(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
