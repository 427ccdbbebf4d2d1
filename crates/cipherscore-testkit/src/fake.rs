//! A scripted confidential engine.
//!
//! [`FakeEngine`] does no cryptography. Ciphertexts carry their score in the
//! clear and proofs are plain blake3 digests, so tests can forge any input
//! they need and script engine refusals without key material.
//!
//! - Ciphertext: 8-byte nonce followed by the 32-byte score word.
//! - Handle: `blake3(ciphertext)`.
//! - Validity proof: `blake3(submitter || ciphertext)`.
//! - Decryption proof: `blake3(handle_0 || .. || handle_n || plaintext)`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use cipherscore_core::{
    decode_score, encode_score, CiphertextHandle, DecryptionProof, ExternalCiphertext, Identity,
    ValidityProof, WORD_LEN,
};
use cipherscore_engine::{ConfidentialEngine, EngineError, Result};

const NONCE_LEN: usize = 8;

/// An engine call, as observed by [`FakeEngine::calls`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Ingest(Identity),
    AuthorizeHolder(CiphertextHandle, Identity),
    MarkPublic(CiphertextHandle),
    CheckDecryption(Vec<CiphertextHandle>),
}

#[derive(Debug, Default)]
struct FakeState {
    ciphertexts: HashMap<CiphertextHandle, Vec<u8>>,
    public: HashSet<CiphertextHandle>,
    calls: Vec<EngineCall>,
}

/// Deterministic engine for tests.
#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
    nonce: AtomicU64,
    reject_ingest: AtomicBool,
    reject_decryption: AtomicBool,
    unavailable: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every ingest from now on.
    pub fn reject_ingest(&self, reject: bool) {
        self.reject_ingest.store(reject, Ordering::SeqCst);
    }

    /// Refuse every decryption proof from now on.
    pub fn reject_decryption(&self, reject: bool) {
        self.reject_decryption.store(reject, Ordering::SeqCst);
    }

    /// Fail every call with `Unavailable` from now on.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Whether `handle` was marked publicly revealable.
    pub fn is_public(&self, handle: &CiphertextHandle) -> bool {
        self.lock().public.contains(handle)
    }

    /// Build a ciphertext for `value` with a proof bound to `submitter`.
    pub fn encrypt(&self, value: u64, submitter: &Identity) -> (ExternalCiphertext, ValidityProof) {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut ciphertext = Vec::with_capacity(NONCE_LEN + WORD_LEN);
        ciphertext.extend_from_slice(&nonce.to_be_bytes());
        ciphertext.extend_from_slice(&encode_score(value));
        let proof = validity_proof(submitter, &ciphertext);
        (ExternalCiphertext::from(ciphertext), proof)
    }

    /// Decrypt `handles` and prove it, ignoring the public flag.
    pub fn decrypt(&self, handles: &[CiphertextHandle]) -> Result<(Vec<u8>, DecryptionProof)> {
        let state = self.lock();
        let mut plaintext = Vec::with_capacity(handles.len() * WORD_LEN);
        for handle in handles {
            let ciphertext = state
                .ciphertexts
                .get(handle)
                .ok_or(EngineError::UnknownHandle(*handle))?;
            plaintext.extend_from_slice(&ciphertext[NONCE_LEN..]);
        }
        let proof = decryption_proof(handles, &plaintext);
        Ok((plaintext, proof))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        // Test-only engine; a poisoned lock means a test already panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("scripted outage".into()));
        }
        Ok(())
    }
}

/// Validity proof the fake engine accepts.
pub fn validity_proof(submitter: &Identity, ciphertext: &[u8]) -> ValidityProof {
    let mut hasher = blake3::Hasher::new();
    hasher.update(submitter.as_bytes());
    hasher.update(ciphertext);
    ValidityProof::from(hasher.finalize().as_bytes().to_vec())
}

/// Decryption proof the fake engine accepts.
pub fn decryption_proof(handles: &[CiphertextHandle], plaintext: &[u8]) -> DecryptionProof {
    let mut hasher = blake3::Hasher::new();
    for handle in handles {
        hasher.update(handle.as_bytes());
    }
    hasher.update(plaintext);
    DecryptionProof::from(hasher.finalize().as_bytes().to_vec())
}

#[async_trait]
impl ConfidentialEngine for FakeEngine {
    async fn ingest(
        &self,
        ciphertext: &ExternalCiphertext,
        proof: &ValidityProof,
        submitter: &Identity,
    ) -> Result<CiphertextHandle> {
        self.check_available()?;
        let mut state = self.lock();
        state.calls.push(EngineCall::Ingest(*submitter));

        if self.reject_ingest.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("scripted ingest rejection".into()));
        }
        let bytes = ciphertext.as_bytes();
        if bytes.len() != NONCE_LEN + WORD_LEN || decode_score(&bytes[NONCE_LEN..]).is_err() {
            return Err(EngineError::Rejected("malformed ciphertext".into()));
        }
        if proof != &validity_proof(submitter, bytes) {
            return Err(EngineError::Rejected("validity proof mismatch".into()));
        }

        let handle = CiphertextHandle::from_bytes(*blake3::hash(bytes).as_bytes());
        state.ciphertexts.insert(handle, bytes.to_vec());
        Ok(handle)
    }

    async fn authorize_holder(&self, handle: &CiphertextHandle, holder: &Identity) -> Result<()> {
        self.check_available()?;
        let mut state = self.lock();
        if !state.ciphertexts.contains_key(handle) {
            return Err(EngineError::UnknownHandle(*handle));
        }
        state.calls.push(EngineCall::AuthorizeHolder(*handle, *holder));
        Ok(())
    }

    async fn mark_publicly_revealable(&self, handle: &CiphertextHandle) -> Result<()> {
        self.check_available()?;
        let mut state = self.lock();
        if !state.ciphertexts.contains_key(handle) {
            return Err(EngineError::UnknownHandle(*handle));
        }
        state.public.insert(*handle);
        state.calls.push(EngineCall::MarkPublic(*handle));
        Ok(())
    }

    async fn check_decryption_proof(
        &self,
        handles: &[CiphertextHandle],
        claimed_plaintext: &[u8],
        proof: &DecryptionProof,
    ) -> Result<()> {
        self.check_available()?;
        let mut state = self.lock();
        state.calls.push(EngineCall::CheckDecryption(handles.to_vec()));

        if self.reject_decryption.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("scripted proof rejection".into()));
        }
        if proof != &decryption_proof(handles, claimed_plaintext) {
            return Err(EngineError::Rejected("decryption proof mismatch".into()));
        }
        Ok(())
    }
}
