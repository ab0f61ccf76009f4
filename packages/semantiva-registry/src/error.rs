use std::collections::HashMap;

use thiserror::Error;

/// Failures raised while resolving a symbol or loading an extension (§4.D, §4.E).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("unknown processor '{0}'")]
    UnknownProcessor(String),

    #[error("processor '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("malformed symbol '{symbol}': {reason}")]
    MalformedSymbol { symbol: String, reason: String },

    #[error("extension loading failed: {0:?}")]
    ExtensionLoadError(HashMap<String, String>),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
