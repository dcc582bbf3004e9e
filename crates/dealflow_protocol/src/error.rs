use thiserror::Error;

/// Errors raised while interpreting wire values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid date value: {0:?}")]
    InvalidDate(String),
    #[error("invalid timestamp value: {0:?}")]
    InvalidTimestamp(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
