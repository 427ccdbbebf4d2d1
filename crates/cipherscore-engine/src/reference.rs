//! A self-contained confidential value engine.
//!
//! Plays both sides of the engine boundary so the ledger can run end to end
//! without an external backend:
//!
//! - **Client side**: [`ReferenceEngine::encrypt_input`] produces a ciphertext
//!   and a validity proof bound to the submitter.
//! - **Ledger side**: the [`ConfidentialEngine`] impl ingests ciphertexts,
//!   keeps a per-handle access list, and checks decryption proofs.
//! - **Oracle side**: [`ReferenceEngine::public_decrypt`] decrypts handles
//!   marked publicly revealable and signs the result.
//!
//! Key material is derived from one 32-byte seed.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
use rand::RngCore;
use tracing::debug;

use cipherscore_core::{
    encode_score, CiphertextHandle, DecryptionProof, ExternalCiphertext, Identity, ValidityProof,
};

use crate::crypto::{
    decryption_message, derive_subkey, handle_for, input_message, verify_attestation, Attestor,
    ScoreCipher,
};
use crate::error::{EngineError, Result};
use crate::traits::ConfidentialEngine;

/// Access-control and ciphertext state, keyed by handle.
#[derive(Debug, Default)]
struct EngineState {
    /// Ingested ciphertexts.
    ciphertexts: HashMap<CiphertextHandle, Vec<u8>>,

    /// Identities allowed to use each handle.
    holders: HashMap<CiphertextHandle, BTreeSet<Identity>>,

    /// Handles anyone may have decrypted.
    public: HashSet<CiphertextHandle>,
}

/// Reference engine backed by ChaCha20-Poly1305 and Ed25519 attestations.
pub struct ReferenceEngine {
    cipher: ScoreCipher,
    input_verifier: Attestor,
    decryption_oracle: Attestor,
    state: RwLock<EngineState>,
}

impl ReferenceEngine {
    /// Create an engine with fresh random keys.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Create an engine whose keys are derived from `seed`.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            cipher: ScoreCipher::from_bytes(derive_subkey("cipherscore engine cipher", seed)),
            input_verifier: Attestor::from_seed(&derive_subkey("cipherscore engine input", seed)),
            decryption_oracle: Attestor::from_seed(&derive_subkey(
                "cipherscore engine oracle",
                seed,
            )),
            state: RwLock::new(EngineState::default()),
        }
    }

    /// Public key that verifies decryption proofs.
    pub fn oracle_key(&self) -> VerifyingKey {
        self.decryption_oracle.verifying_key()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineState>> {
        self.state
            .read()
            .map_err(|_| EngineError::Unavailable("engine state poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineState>> {
        self.state
            .write()
            .map_err(|_| EngineError::Unavailable("engine state poisoned".into()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Client Side
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt a score for `submitter` and attest it is well-formed.
    pub fn encrypt_input(
        &self,
        value: u64,
        submitter: &Identity,
    ) -> Result<(ExternalCiphertext, ValidityProof)> {
        let ciphertext = self.cipher.encrypt(value)?;
        let proof = self
            .input_verifier
            .sign(&input_message(submitter, &ciphertext));
        Ok((
            ExternalCiphertext::from(ciphertext),
            ValidityProof::from(proof.to_vec()),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `identity` may use `handle`.
    pub fn is_allowed(&self, handle: &CiphertextHandle, identity: &Identity) -> Result<bool> {
        Ok(self
            .read()?
            .holders
            .get(handle)
            .is_some_and(|holders| holders.contains(identity)))
    }

    /// Whether `handle` may be decrypted publicly.
    pub fn is_publicly_revealable(&self, handle: &CiphertextHandle) -> Result<bool> {
        Ok(self.read()?.public.contains(handle))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Oracle Side
    // ─────────────────────────────────────────────────────────────────────────

    /// Decrypt publicly revealable handles and sign the plaintext.
    ///
    /// Returns the plaintext encoding (one 32-byte word per handle) and a
    /// proof that [`ConfidentialEngine::check_decryption_proof`] accepts.
    pub fn public_decrypt(
        &self,
        handles: &[CiphertextHandle],
    ) -> Result<(Vec<u8>, DecryptionProof)> {
        let state = self.read()?;

        let mut plaintext = Vec::with_capacity(handles.len() * cipherscore_core::WORD_LEN);
        for handle in handles {
            if !state.public.contains(handle) {
                return Err(EngineError::Rejected(format!(
                    "handle {:?} is not publicly revealable",
                    handle
                )));
            }
            let ciphertext = state
                .ciphertexts
                .get(handle)
                .ok_or(EngineError::UnknownHandle(*handle))?;
            let value = self.cipher.decrypt(ciphertext)?;
            plaintext.extend_from_slice(&encode_score(value));
        }

        let signature = self
            .decryption_oracle
            .sign(&decryption_message(handles, &plaintext));
        Ok((plaintext, DecryptionProof::from(signature.to_vec())))
    }

    /// Decrypt a handle for an identity on its access list.
    pub fn user_decrypt(&self, handle: &CiphertextHandle, requester: &Identity) -> Result<u64> {
        let state = self.read()?;
        let ciphertext = state
            .ciphertexts
            .get(handle)
            .ok_or(EngineError::UnknownHandle(*handle))?;

        let allowed = state
            .holders
            .get(handle)
            .is_some_and(|holders| holders.contains(requester));
        if !allowed {
            return Err(EngineError::Rejected(format!(
                "{} is not allowed to decrypt {:?}",
                requester, handle
            )));
        }

        self.cipher.decrypt(ciphertext)
    }
}

#[async_trait]
impl ConfidentialEngine for ReferenceEngine {
    async fn ingest(
        &self,
        ciphertext: &ExternalCiphertext,
        proof: &ValidityProof,
        submitter: &Identity,
    ) -> Result<CiphertextHandle> {
        verify_attestation(
            &self.input_verifier.verifying_key(),
            &input_message(submitter, ciphertext.as_bytes()),
            proof.as_bytes(),
        )?;

        // A valid attestation over garbage is still garbage.
        self.cipher.decrypt(ciphertext.as_bytes())?;

        let handle = handle_for(ciphertext.as_bytes());
        let mut state = self.write()?;
        state
            .ciphertexts
            .entry(handle)
            .or_insert_with(|| ciphertext.as_bytes().to_vec());
        state.holders.entry(handle).or_default().insert(*submitter);

        debug!(?handle, %submitter, "ingested ciphertext");
        Ok(handle)
    }

    async fn authorize_holder(&self, handle: &CiphertextHandle, holder: &Identity) -> Result<()> {
        let mut state = self.write()?;
        if !state.ciphertexts.contains_key(handle) {
            return Err(EngineError::UnknownHandle(*handle));
        }
        state.holders.entry(*handle).or_default().insert(*holder);
        Ok(())
    }

    async fn mark_publicly_revealable(&self, handle: &CiphertextHandle) -> Result<()> {
        let mut state = self.write()?;
        if !state.ciphertexts.contains_key(handle) {
            return Err(EngineError::UnknownHandle(*handle));
        }
        state.public.insert(*handle);
        Ok(())
    }

    async fn check_decryption_proof(
        &self,
        handles: &[CiphertextHandle],
        claimed_plaintext: &[u8],
        proof: &DecryptionProof,
    ) -> Result<()> {
        if handles.is_empty() {
            return Err(EngineError::Rejected("no handles to check".into()));
        }
        verify_attestation(
            &self.decryption_oracle.verifying_key(),
            &decryption_message(handles, claimed_plaintext),
            proof.as_bytes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::from_bytes([0xa1; 32])
    }

    fn ledger() -> Identity {
        Identity::from_bytes([0x1e; 32])
    }

    #[tokio::test]
    async fn test_ingest_accepts_own_input() {
        let engine = ReferenceEngine::from_seed(&[1; 32]);
        let (ct, proof) = engine.encrypt_input(720, &alice()).unwrap();

        let handle = engine.ingest(&ct, &proof, &alice()).await.unwrap();
        assert!(engine.is_allowed(&handle, &alice()).unwrap());
        assert!(!engine.is_publicly_revealable(&handle).unwrap());
        assert_eq!(engine.user_decrypt(&handle, &alice()).unwrap(), 720);
    }

    #[tokio::test]
    async fn test_ingest_rejects_replayed_proof() {
        let engine = ReferenceEngine::from_seed(&[1; 32]);
        let (ct, proof) = engine.encrypt_input(720, &alice()).unwrap();

        // Same ciphertext submitted by someone else.
        let err = engine.ingest(&ct, &proof, &ledger()).await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_ingest_rejects_foreign_engine_input() {
        let engine = ReferenceEngine::from_seed(&[1; 32]);
        let other = ReferenceEngine::from_seed(&[2; 32]);
        let (ct, proof) = other.encrypt_input(1, &alice()).unwrap();
        assert!(engine.ingest(&ct, &proof, &alice()).await.is_err());
    }

    #[tokio::test]
    async fn test_permissions_require_known_handle() {
        let engine = ReferenceEngine::from_seed(&[1; 32]);
        let unknown = CiphertextHandle::from_bytes([0; 32]);
        assert_eq!(
            engine.authorize_holder(&unknown, &ledger()).await,
            Err(EngineError::UnknownHandle(unknown))
        );
        assert_eq!(
            engine.mark_publicly_revealable(&unknown).await,
            Err(EngineError::UnknownHandle(unknown))
        );
    }

    #[tokio::test]
    async fn test_public_decrypt_roundtrip() {
        let engine = ReferenceEngine::from_seed(&[1; 32]);
        let (ct, proof) = engine.encrypt_input(77, &alice()).unwrap();
        let handle = engine.ingest(&ct, &proof, &alice()).await.unwrap();

        // Not public yet.
        assert!(engine.public_decrypt(&[handle]).is_err());

        engine.authorize_holder(&handle, &ledger()).await.unwrap();
        engine.authorize_holder(&handle, &ledger()).await.unwrap();
        engine.mark_publicly_revealable(&handle).await.unwrap();

        let (plaintext, decryption_proof) = engine.public_decrypt(&[handle]).unwrap();
        assert_eq!(plaintext, encode_score(77).to_vec());
        engine
            .check_decryption_proof(&[handle], &plaintext, &decryption_proof)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_decryption_proof_verifies_under_oracle_key() {
        let engine = ReferenceEngine::from_seed(&[1; 32]);
        let (ct, proof) = engine.encrypt_input(300, &alice()).unwrap();
        let handle = engine.ingest(&ct, &proof, &alice()).await.unwrap();
        engine.mark_publicly_revealable(&handle).await.unwrap();

        // Third parties can check the oracle's signature without the engine.
        let (plaintext, decryption_proof) = engine.public_decrypt(&[handle]).unwrap();
        let message = decryption_message(&[handle], &plaintext);
        verify_attestation(&engine.oracle_key(), &message, decryption_proof.as_bytes()).unwrap();

        let other = ReferenceEngine::from_seed(&[2; 32]);
        assert!(
            verify_attestation(&other.oracle_key(), &message, decryption_proof.as_bytes())
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_check_rejects_tampered_plaintext_and_wrong_handle() {
        let engine = ReferenceEngine::from_seed(&[1; 32]);
        let mut handles = Vec::new();
        for value in [77, 78] {
            let (ct, proof) = engine.encrypt_input(value, &alice()).unwrap();
            let handle = engine.ingest(&ct, &proof, &alice()).await.unwrap();
            engine.mark_publicly_revealable(&handle).await.unwrap();
            handles.push(handle);
        }

        let (plaintext, proof) = engine.public_decrypt(&handles[..1]).unwrap();

        let forged = encode_score(99);
        assert!(engine
            .check_decryption_proof(&handles[..1], &forged, &proof)
            .await
            .is_err());
        assert!(engine
            .check_decryption_proof(&handles[1..], &plaintext, &proof)
            .await
            .is_err());
        assert!(engine
            .check_decryption_proof(&[], &plaintext, &proof)
            .await
            .is_err());
    }
}
