//! Error types for the ledger.

use cipherscore_core::{CoreError, RecordId};
use cipherscore_engine::EngineError;
use cipherscore_store::StoreError;
use thiserror::Error;

/// Errors returned by ledger operations.
///
/// Every error leaves the ledger exactly as it was before the call. None are
/// retried internally.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The id is already registered. Pick another id.
    #[error("record already exists: {0}")]
    AlreadyExists(RecordId),

    /// No record with this id.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The engine refused the submitted ciphertext or its validity proof.
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// The engine refused the decryption proof. Obtain a fresh proof.
    #[error("invalid decryption proof: {0}")]
    InvalidProof(String),

    /// The record's plaintext is already sealed. Stop retrying.
    #[error("record already verified: {0}")]
    AlreadyVerified(RecordId),

    /// The claimed plaintext is not a valid score encoding.
    #[error("malformed plaintext encoding: {0}")]
    MalformedEncoding(String),

    /// A caller-supplied field is empty or too long.
    #[error("invalid field: {0}")]
    InvalidField(CoreError),

    /// Storage failure.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Engine failure that is not a verdict on the input.
    #[error("engine error: {0}")]
    Engine(EngineError),
}

/// Stable classification of [`LedgerError`], for presentation layers that
/// must render each failure distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    InvalidCiphertext,
    InvalidProof,
    AlreadyVerified,
    MalformedEncoding,
    InvalidField,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::InvalidCiphertext(_) => ErrorKind::InvalidCiphertext,
            LedgerError::InvalidProof(_) => ErrorKind::InvalidProof,
            LedgerError::AlreadyVerified(_) => ErrorKind::AlreadyVerified,
            LedgerError::MalformedEncoding(_) => ErrorKind::MalformedEncoding,
            LedgerError::InvalidField(_) => ErrorKind::InvalidField,
            LedgerError::Store(_) | LedgerError::Engine(_) => ErrorKind::Internal,
        }
    }

    /// Whether the reveal attempt failed because its proof material was bad.
    ///
    /// Undecodable plaintexts count: they are a form of invalid proof.
    pub fn is_proof_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidProof(_) | LedgerError::MalformedEncoding(_)
        )
    }
}

impl From<CoreError> for LedgerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MalformedEncoding(msg) => LedgerError::MalformedEncoding(msg),
            other => LedgerError::InvalidField(other),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(id) => LedgerError::AlreadyExists(id),
            StoreError::NotFound(id) => LedgerError::NotFound(id),
            StoreError::AlreadyVerified(id) => LedgerError::AlreadyVerified(id),
            other => LedgerError::Store(other),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
