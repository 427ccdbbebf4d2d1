//! # Cipherscore
//!
//! A ledger of confidential credit scores that stay encrypted until someone
//! proves what they decrypt to.
//!
//! ## Overview
//!
//! - **Register**: a caller submits an encrypted score with a validity proof.
//!   The confidential engine ingests it and the ledger stores the resulting
//!   handle alongside plaintext metadata.
//! - **Reveal**: anyone submits a claimed plaintext with a decryption proof.
//!   If the engine accepts the proof for the stored handle, the plaintext is
//!   sealed into the record forever.
//!
//! ## Key Concepts
//!
//! - **Record**: write-once, except for a single reveal.
//! - **First reveal wins**: every later reveal attempt fails `AlreadyVerified`.
//! - **Audit log**: every registration and reveal appends an event.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cipherscore::{Identity, Ledger, LedgerConfig, RegisterRequest};
//! use cipherscore::engine::ReferenceEngine;
//! use cipherscore::store::SqliteStore;
//!
//! async fn example() {
//!     let engine = Arc::new(ReferenceEngine::generate());
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let ledger = Ledger::new(store, engine.clone(), LedgerConfig::default());
//!
//!     let alice = Identity::from_bytes([1; 32]);
//!     let (ciphertext, proof) = engine.encrypt_input(720, &alice).unwrap();
//!     let record = ledger
//!         .register(&alice, RegisterRequest::new("r1", "Alice", ciphertext, proof))
//!         .await
//!         .unwrap();
//!
//!     let (plaintext, decryption_proof) = engine.public_decrypt(&[record.ciphertext]).unwrap();
//!     let score = ledger
//!         .validate_decryption(&record.id, &plaintext, &decryption_proof)
//!         .await
//!         .unwrap();
//!     assert_eq!(score, 720);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cipherscore::core` - Core types (Record, RecordId, Identity, ...)
//! - `cipherscore::store` - Record stores (memory, SQLite)
//! - `cipherscore::engine` - Confidential engine trait and reference engine

pub mod config;
pub mod error;
pub mod ledger;

pub use cipherscore_core as core;
pub use cipherscore_engine as engine;
pub use cipherscore_store as store;

pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError, Result};
pub use ledger::{Ledger, RegisterRequest};

pub use cipherscore_core::{
    CiphertextHandle, DecryptionProof, ExternalCiphertext, Identity, LedgerEvent,
    LedgerEventKind, Record, RecordFields, RecordId, RecordState, ValidityProof,
};
