use thiserror::Error;

pub type Result<T> = std::result::Result<T, TypesError>;

/// Errors raised by the data/context model (§4.A, §7).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypesError {
    #[error("key '{0}' not found in context")]
    KeyNotFound(String),

    #[error("key '{key}' is present in both the global context and item context {item_index}")]
    FragileOverlap { key: String, item_index: usize },

    #[error("context collection item index {0} out of range")]
    ItemIndexOutOfRange(usize),

    #[error("cannot set item value for key '{0}': key is global")]
    GlobalKeyOnItem(String),

    #[error("data collection element type mismatch: expected '{expected}', got '{actual}'")]
    CollectionElementTypeMismatch { expected: String, actual: String },

    #[error("NoData is not permitted inside a DataCollection")]
    NoDataInCollection,

    #[error("payload source key '{0}' already present in context")]
    DuplicateContextKey(String),
}
