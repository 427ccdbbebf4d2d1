//! Cryptographic building blocks for the reference engine.
//!
//! ChaCha20-Poly1305 for score ciphertexts, Ed25519 for input and decryption
//! attestations, Blake3 for handle derivation and message binding.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;

use cipherscore_core::{CiphertextHandle, Identity};

use crate::error::{EngineError, Result};

/// Length of the nonce prefix on every external ciphertext.
pub const NONCE_LEN: usize = 12;

const HANDLE_CONTEXT: &str = "cipherscore handle v1";
const INPUT_CONTEXT: &str = "cipherscore input v1";
const DECRYPT_CONTEXT: &str = "cipherscore decrypt v1";

/// Derive a 32-byte subkey from a seed for a named purpose.
pub fn derive_subkey(context: &str, seed: &[u8; 32]) -> [u8; 32] {
    blake3::derive_key(context, seed)
}

/// The handle an engine assigns to an ingested ciphertext.
pub fn handle_for(ciphertext: &[u8]) -> CiphertextHandle {
    CiphertextHandle::from_bytes(blake3::derive_key(HANDLE_CONTEXT, ciphertext))
}

/// Message signed by the input verifier: binds a ciphertext to its submitter.
pub fn input_message(submitter: &Identity, ciphertext: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(INPUT_CONTEXT);
    hasher.update(submitter.as_bytes());
    hasher.update(&(ciphertext.len() as u64).to_be_bytes());
    hasher.update(ciphertext);
    *hasher.finalize().as_bytes()
}

/// Message signed by the decryption oracle: binds handles to a plaintext.
pub fn decryption_message(handles: &[CiphertextHandle], plaintext: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(DECRYPT_CONTEXT);
    hasher.update(&(handles.len() as u64).to_be_bytes());
    for handle in handles {
        hasher.update(handle.as_bytes());
    }
    hasher.update(plaintext);
    *hasher.finalize().as_bytes()
}

/// Symmetric cipher for scores. Ciphertext layout: `nonce(12) || sealed`.
#[derive(Clone)]
pub struct ScoreCipher {
    key: [u8; 32],
}

impl ScoreCipher {
    pub const fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.key).map_err(|e| EngineError::Crypto(e.to_string()))
    }

    /// Encrypt a score under a fresh random nonce.
    pub fn encrypt(&self, value: u64) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), value.to_be_bytes().as_slice())
            .map_err(|e| EngineError::Crypto(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt a score. Any malformed or forged input is a rejection.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<u64> {
        if ciphertext.len() <= NONCE_LEN {
            return Err(EngineError::Rejected("ciphertext too short".into()));
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);

        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| EngineError::Rejected("ciphertext failed authentication".into()))?;

        let bytes: [u8; 8] = plaintext
            .try_into()
            .map_err(|_| EngineError::Rejected("ciphertext does not hold a score".into()))?;
        Ok(u64::from_be_bytes(bytes))
    }
}

/// An Ed25519 attestation key.
#[derive(Clone)]
pub struct Attestor {
    signing_key: SigningKey,
}

impl Attestor {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Verify an attestation. Malformed signatures are rejections, not errors.
pub fn verify_attestation(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let signature = Signature::from_slice(signature)
        .map_err(|_| EngineError::Rejected("malformed signature".into()))?;
    key.verify(message, &signature)
        .map_err(|_| EngineError::Rejected("signature does not verify".into()))
}
