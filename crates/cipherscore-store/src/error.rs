//! Error types for the store module.

use cipherscore_core::RecordId;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this id already exists.
    #[error("record already exists: {0}")]
    AlreadyExists(RecordId),

    /// No record with this id.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The record's plaintext has already been revealed.
    #[error("record already verified: {0}")]
    AlreadyVerified(RecordId),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Event payload serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
