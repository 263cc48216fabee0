use thiserror::Error;

/// Domain-level errors raised while building or decoding domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unsupported order action: {0}")]
    UnsupportedOrderAction(String),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Invalid historical duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Unknown order state: {0}")]
    UnknownOrderState(String),
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;
