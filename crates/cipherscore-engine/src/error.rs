//! Error types for the engine module.

use cipherscore_core::CiphertextHandle;
use thiserror::Error;

/// Errors returned by a confidential value engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine refused a ciphertext or proof. Permanent for that input.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The handle was never issued by this engine.
    #[error("unknown ciphertext handle: {0:?}")]
    UnknownHandle(CiphertextHandle),

    /// Local cryptographic failure (not a verdict on the input).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The engine backend could not be reached.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    /// Whether this is a verdict on the caller's input.
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Rejected(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
