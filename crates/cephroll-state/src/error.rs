//! Error types for hand-off stores.

use thiserror::Error;

/// Result type alias for hand-off store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur reading or writing coordination markers.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("malformed marker {key}: {value:?}")]
    Malformed { key: String, value: String },
}
