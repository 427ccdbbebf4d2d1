//! # Cipherscore Testkit
//!
//! Testing utilities for Cipherscore.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fake engine**: A scripted [`ConfidentialEngine`](cipherscore_engine::ConfidentialEngine)
//!   with forgeable proofs and switchable refusals
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up ledger scenarios
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cipherscore_testkit::generators::RegistrationParams;
//!
//! proptest! {
//!     #[test]
//!     fn ids_survive_serde(params: RegistrationParams) {
//!         let json = serde_json::to_string(&params.id).unwrap();
//!         prop_assert_eq!(serde_json::from_str::<RecordId>(&json).unwrap(), params.id);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use cipherscore_testkit::{identities, LedgerFixture};
//!
//! async fn example() {
//!     let fixture = LedgerFixture::new();
//!     let alice = identities(1)[0];
//!     let id = fixture.register("r1", 720, &alice).await.unwrap();
//!     assert_eq!(fixture.reveal(&id).await.unwrap(), 720);
//! }
//! ```

pub mod fake;
pub mod fixtures;
pub mod generators;

pub use fake::{decryption_proof, validity_proof, EngineCall, FakeEngine};
pub use fixtures::{identities, LedgerFixture, LEDGER_IDENTITY};
pub use generators::{workload, RegistrationParams};
