//! Error types for Cipherscore core.

use thiserror::Error;

/// Errors raised while constructing or decoding core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field} is {len} bytes, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("malformed plaintext encoding: {0}")]
    MalformedEncoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
