//! Confidential records.
//!
//! A record is born `Registered` with every field fixed except the reveal
//! pair (`revealed_value`, `verified`), which is written exactly once when a
//! decryption proof is accepted. Records are never deleted.

use serde::{Deserialize, Serialize};

use crate::types::{CiphertextHandle, Identity, RecordId};

/// Lifecycle state of a record.
///
/// `Unregistered` is not represented: a record that does not exist has no
/// state at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordState {
    /// Ciphertext stored, plaintext not yet proven.
    Registered,
    /// Plaintext proven and sealed. Terminal.
    Verified,
}

/// Caller-supplied plaintext metadata for a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    /// Human-readable label. Must be non-empty.
    pub label: String,
    /// Informational public metadata, never confidential.
    pub public_factor1: u64,
    /// Informational public metadata, never confidential.
    pub public_factor2: u64,
    /// Free-text public notes.
    pub notes: String,
}

impl RecordFields {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            public_factor1: 0,
            public_factor2: 0,
            notes: String::new(),
        }
    }

    pub fn factors(mut self, factor1: u64, factor2: u64) -> Self {
        self.public_factor1 = factor1;
        self.public_factor2 = factor2;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// The unit of confidential storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub label: String,
    pub ciphertext: CiphertextHandle,
    pub public_factor1: u64,
    pub public_factor2: u64,
    pub notes: String,
    pub owner: Identity,
    /// Registration time (Unix ms).
    pub created_at: i64,
    /// Plaintext score. `None` until verified.
    pub revealed_value: Option<u64>,
    pub verified: bool,
    /// Reveal time (Unix ms). `None` until verified.
    pub verified_at: Option<i64>,
}

impl Record {
    /// Build a freshly registered, unverified record.
    pub fn registered(
        id: RecordId,
        fields: RecordFields,
        ciphertext: CiphertextHandle,
        owner: Identity,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            label: fields.label,
            ciphertext,
            public_factor1: fields.public_factor1,
            public_factor2: fields.public_factor2,
            notes: fields.notes,
            owner,
            created_at,
            revealed_value: None,
            verified: false,
            verified_at: None,
        }
    }

    pub fn state(&self) -> RecordState {
        if self.verified {
            RecordState::Verified
        } else {
            RecordState::Registered
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Seal the reveal pair.
    ///
    /// Returns `false` without touching the record if it was already verified.
    pub fn seal(&mut self, revealed_value: u64, at: i64) -> bool {
        if self.verified {
            return false;
        }
        self.revealed_value = Some(revealed_value);
        self.verified = true;
        self.verified_at = Some(at);
        true
    }
}
