use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContractError {
    #[error("unknown rule code: {0}")]
    UnknownRuleCode(String),
}

pub type Result<T> = std::result::Result<T, ContractError>;
