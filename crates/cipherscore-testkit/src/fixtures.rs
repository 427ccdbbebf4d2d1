//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use cipherscore::{Ledger, LedgerConfig, LedgerError, RegisterRequest, Result};
use cipherscore_core::{DecryptionProof, Identity, RecordId};
use cipherscore_store::MemoryStore;

use crate::fake::FakeEngine;

/// Holder identity every fixture ledger is configured with.
pub const LEDGER_IDENTITY: Identity = Identity::from_bytes([0x1e; 32]);

/// A ledger over a memory store and a scripted engine.
pub struct LedgerFixture {
    pub ledger: Ledger<MemoryStore, Arc<FakeEngine>>,
    pub engine: Arc<FakeEngine>,
}

impl LedgerFixture {
    pub fn new() -> Self {
        let engine = Arc::new(FakeEngine::new());
        let ledger = Ledger::new(
            MemoryStore::new(),
            engine.clone(),
            LedgerConfig::new(LEDGER_IDENTITY),
        );
        Self { ledger, engine }
    }

    /// A registration request for `score` submitted by `caller`.
    pub fn request(&self, id: &str, label: &str, score: u64, caller: &Identity) -> RegisterRequest {
        let (ciphertext, proof) = self.engine.encrypt(score, caller);
        RegisterRequest::new(id, label, ciphertext, proof)
    }

    /// Register `score` under `id` and return the typed id.
    pub async fn register(&self, id: &str, score: u64, caller: &Identity) -> Result<RecordId> {
        let request = self.request(id, id, score, caller);
        Ok(self.ledger.register(caller, request).await?.id)
    }

    /// A valid plaintext and proof for the record's handle.
    pub async fn reveal_material(&self, id: &RecordId) -> Result<(Vec<u8>, DecryptionProof)> {
        let handle = self.ledger.get_ciphertext_handle(id).await?;
        self.engine
            .decrypt(&[handle])
            .map_err(LedgerError::Engine)
    }

    /// Reveal a record with valid proof material.
    pub async fn reveal(&self, id: &RecordId) -> Result<u64> {
        let (plaintext, proof) = self.reveal_material(id).await?;
        self.ledger.validate_decryption(id, &plaintext, &proof).await
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct caller identities for multi-party tests.
pub fn identities(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[0] = 0xc0;
            bytes[1] = i as u8;
            Identity::from_bytes(bytes)
        })
        .collect()
}
