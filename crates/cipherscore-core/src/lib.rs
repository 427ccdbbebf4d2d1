//! # Cipherscore Core
//!
//! Pure primitives for Cipherscore: confidential records, identities,
//! ciphertext handles, audit events and plaintext score encoding.
//!
//! This crate contains no I/O, no storage, no cryptography. Ciphertexts and
//! proofs are opaque bytes here; only the confidential engine interprets them.
//!
//! ## Key Types
//!
//! - [`Record`] - The unit of confidential storage
//! - [`RecordId`] - Externally chosen, non-empty record key
//! - [`Identity`] - Authenticated caller identity
//! - [`CiphertextHandle`] - Engine-issued reference to an encrypted score
//! - [`LedgerEvent`] - Entry in the append-only audit log
//!
//! ## Score Encoding
//!
//! Revealed plaintexts are 32-byte big-endian words. See [`encoding`].

pub mod encoding;
pub mod error;
pub mod event;
pub mod proof;
pub mod record;
pub mod types;
pub mod validation;

pub use encoding::{decode_score, encode_score, WORD_LEN};
pub use error::{CoreError, Result};
pub use event::{LedgerEvent, LedgerEventKind};
pub use proof::{DecryptionProof, ExternalCiphertext, ValidityProof};
pub use record::{Record, RecordFields, RecordState};
pub use types::{CiphertextHandle, Identity, RecordId, MAX_RECORD_ID_LEN};
pub use validation::{validate_fields, validate_id, FieldLimits};
