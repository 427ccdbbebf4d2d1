//! # Cipherscore Engine
//!
//! The confidential value engine boundary.
//!
//! ## Overview
//!
//! The ledger depends on an engine through the [`ConfidentialEngine`] trait:
//! ingest a ciphertext with its validity proof, grant permissions on the
//! resulting handle, and check decryption proofs. The engine is the only
//! component that ever touches plaintext scores.
//!
//! [`ReferenceEngine`] is a complete in-process engine (ChaCha20-Poly1305
//! ciphertexts, Ed25519 attestations) for running a ledger without an
//! external backend.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cipherscore_core::Identity;
//! use cipherscore_engine::{ConfidentialEngine, ReferenceEngine};
//!
//! async fn example() {
//!     let engine = ReferenceEngine::generate();
//!     let alice = Identity::from_bytes([1; 32]);
//!
//!     let (ciphertext, proof) = engine.encrypt_input(720, &alice).unwrap();
//!     let handle = engine.ingest(&ciphertext, &proof, &alice).await.unwrap();
//!
//!     engine.mark_publicly_revealable(&handle).await.unwrap();
//!     let (plaintext, decryption_proof) = engine.public_decrypt(&[handle]).unwrap();
//!     engine
//!         .check_decryption_proof(&[handle], &plaintext, &decryption_proof)
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod crypto;
pub mod error;
pub mod reference;
pub mod traits;

pub use error::{EngineError, Result};
pub use reference::ReferenceEngine;
pub use traits::ConfidentialEngine;
