//! The confidential value engine capability.
//!
//! The ledger never sees plaintext scores or keys. It only asks an engine to
//! accept ciphertexts, grant permissions on handles, and check decryption
//! proofs. Anything implementing [`ConfidentialEngine`] can back a ledger.

use std::sync::Arc;

use async_trait::async_trait;
use cipherscore_core::{
    CiphertextHandle, DecryptionProof, ExternalCiphertext, Identity, ValidityProof,
};

use crate::error::Result;

/// Capability interface consumed by the ledger.
///
/// Every check is fail-fast. A `Rejected` answer is final for that input; the
/// ledger never retries.
#[async_trait]
pub trait ConfidentialEngine: Send + Sync {
    /// Accept an externally supplied ciphertext given its validity proof.
    ///
    /// Returns the engine's internal handle for the value.
    async fn ingest(
        &self,
        ciphertext: &ExternalCiphertext,
        proof: &ValidityProof,
        submitter: &Identity,
    ) -> Result<CiphertextHandle>;

    /// Allow `holder` to request decryption checks on `handle`. Idempotent.
    async fn authorize_holder(&self, handle: &CiphertextHandle, holder: &Identity) -> Result<()>;

    /// Make `handle` eligible for public decryption. Idempotent.
    async fn mark_publicly_revealable(&self, handle: &CiphertextHandle) -> Result<()>;

    /// Check that `proof` attests `handles` decrypt to `claimed_plaintext`.
    async fn check_decryption_proof(
        &self,
        handles: &[CiphertextHandle],
        claimed_plaintext: &[u8],
        proof: &DecryptionProof,
    ) -> Result<()>;
}

#[async_trait]
impl<E: ConfidentialEngine + ?Sized> ConfidentialEngine for Arc<E> {
    async fn ingest(
        &self,
        ciphertext: &ExternalCiphertext,
        proof: &ValidityProof,
        submitter: &Identity,
    ) -> Result<CiphertextHandle> {
        (**self).ingest(ciphertext, proof, submitter).await
    }

    async fn authorize_holder(&self, handle: &CiphertextHandle, holder: &Identity) -> Result<()> {
        (**self).authorize_holder(handle, holder).await
    }

    async fn mark_publicly_revealable(&self, handle: &CiphertextHandle) -> Result<()> {
        (**self).mark_publicly_revealable(handle).await
    }

    async fn check_decryption_proof(
        &self,
        handles: &[CiphertextHandle],
        claimed_plaintext: &[u8],
        proof: &DecryptionProof,
    ) -> Result<()> {
        (**self)
            .check_decryption_proof(handles, claimed_plaintext, proof)
            .await
    }
}
