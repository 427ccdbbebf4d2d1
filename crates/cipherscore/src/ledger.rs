//! The Ledger: register confidential scores, then reveal each one exactly once.
//!
//! Per-record state machine:
//!
//! ```text
//! Unregistered --register--> Registered --validate_decryption--> Verified
//! ```
//!
//! No transition is skipped or reversed. The two state-changing operations
//! are serialized through one write gate; reads go straight to the store.

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use cipherscore_core::{
    decode_score, validate_fields, validate_id, CiphertextHandle, DecryptionProof,
    ExternalCiphertext, Identity, LedgerEvent, Record, RecordFields, RecordId, ValidityProof,
};
use cipherscore_engine::{ConfidentialEngine, EngineError};
use cipherscore_store::RecordStore;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// Everything a caller submits to register a score.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub id: String,
    pub fields: RecordFields,
    pub ciphertext: ExternalCiphertext,
    pub validity_proof: ValidityProof,
}

impl RegisterRequest {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        ciphertext: ExternalCiphertext,
        validity_proof: ValidityProof,
    ) -> Self {
        Self {
            id: id.into(),
            fields: RecordFields::new(label),
            ciphertext,
            validity_proof,
        }
    }

    pub fn factors(mut self, factor1: u64, factor2: u64) -> Self {
        self.fields = self.fields.factors(factor1, factor2);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.fields = self.fields.notes(notes);
        self
    }
}

/// The confidential score ledger.
///
/// Owns all mutable ledger state through its store. Nothing else should write
/// to that store.
pub struct Ledger<S: RecordStore, E: ConfidentialEngine> {
    store: S,
    engine: E,
    config: LedgerConfig,
    /// Serializes writers. Holds the seq of the last event published to
    /// subscribers (`None` until the first write reads it from the store).
    write_gate: Mutex<Option<u64>>,
    events: broadcast::Sender<LedgerEvent>,
}

impl<S: RecordStore, E: ConfidentialEngine> Ledger<S, E> {
    /// Create a ledger over a store and an engine.
    pub fn new(store: S, engine: E, config: LedgerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            store,
            engine,
            config,
            write_gate: Mutex::new(None),
            events,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Subscribe to audit events committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State-Changing Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new confidential score owned by `caller`.
    ///
    /// The engine must accept the ciphertext; the ledger is then made a
    /// holder of the resulting handle and the handle is marked publicly
    /// revealable before the record is stored.
    pub async fn register(&self, caller: &Identity, request: RegisterRequest) -> Result<Record> {
        let RegisterRequest {
            id,
            fields,
            ciphertext,
            validity_proof,
        } = request;

        validate_id(&id, &self.config.limits)?;
        let id = RecordId::new(id)?;
        validate_fields(&fields, &self.config.limits)?;

        let mut cursor = self.write_gate.lock().await;
        let published = self.published_seq(&cursor).await?;

        if self.store.contains(&id).await? {
            warn!(%id, "duplicate registration rejected");
            return Err(LedgerError::AlreadyExists(id));
        }

        debug!(%id, bytes = ciphertext.len(), "ingesting ciphertext");
        let handle = self
            .engine
            .ingest(&ciphertext, &validity_proof, caller)
            .await
            .map_err(|e| match e {
                EngineError::Rejected(reason) => {
                    warn!(%id, %reason, "ciphertext rejected");
                    LedgerError::InvalidCiphertext(reason)
                }
                other => LedgerError::Engine(other),
            })?;

        self.engine
            .authorize_holder(&handle, &self.config.ledger_identity)
            .await
            .map_err(LedgerError::Engine)?;
        self.engine
            .mark_publicly_revealable(&handle)
            .await
            .map_err(LedgerError::Engine)?;

        let record = Record::registered(id, fields, handle, *caller, now_millis());
        let stored = self.store.create(&record).await?;

        self.publish_since(published, &mut cursor).await;
        info!(id = %stored.id, owner = %stored.owner, "record registered");
        Ok(stored)
    }

    /// Reveal a record's score using a decryption proof.
    ///
    /// The first accepted proof wins. Every later call for the same id fails
    /// with `AlreadyVerified`, whether its proof is valid or not.
    pub async fn validate_decryption(
        &self,
        id: &RecordId,
        claimed_plaintext: &[u8],
        proof: &DecryptionProof,
    ) -> Result<u64> {
        let mut cursor = self.write_gate.lock().await;
        let published = self.published_seq(&cursor).await?;

        let record = self.store.get(id).await?;
        if record.is_verified() {
            warn!(%id, "reveal attempted on verified record");
            return Err(LedgerError::AlreadyVerified(id.clone()));
        }

        let handles = [record.ciphertext];
        self.engine
            .check_decryption_proof(&handles, claimed_plaintext, proof)
            .await
            .map_err(|e| match e {
                EngineError::Rejected(reason) => {
                    warn!(%id, %reason, "decryption proof rejected");
                    LedgerError::InvalidProof(reason)
                }
                other => LedgerError::Engine(other),
            })?;

        let value = decode_score(claimed_plaintext)?;
        self.store.mark_verified(id, value, now_millis()).await?;

        self.publish_since(published, &mut cursor).await;
        info!(%id, revealed_value = value, "record verified");
        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read-Only Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn get_record(&self, id: &RecordId) -> Result<Record> {
        Ok(self.store.get(id).await?)
    }

    pub async fn get_ciphertext_handle(&self, id: &RecordId) -> Result<CiphertextHandle> {
        Ok(self.store.get(id).await?.ciphertext)
    }

    /// All record ids in registration order.
    pub async fn list_ids(&self) -> Result<Vec<RecordId>> {
        Ok(self.store.list_ids().await?)
    }

    pub async fn record_count(&self) -> Result<usize> {
        Ok(self.store.len().await?)
    }

    /// Audit events with `seq > after_seq`.
    pub async fn events_since(&self, after_seq: u64) -> Result<Vec<LedgerEvent>> {
        Ok(self.store.events_since(after_seq).await?)
    }

    /// Liveness: whether the backing store answers.
    pub async fn is_operational(&self) -> bool {
        match self.store.len().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "store unavailable");
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Publication
    // ─────────────────────────────────────────────────────────────────────────

    async fn published_seq(&self, cursor: &Option<u64>) -> Result<u64> {
        match cursor {
            Some(seq) => Ok(*seq),
            None => Ok(self.store.last_event_seq().await?),
        }
    }

    /// Forward committed events after `published` to live subscribers.
    ///
    /// The write is already committed here, so a read failure only delays
    /// publication until the next write.
    async fn publish_since(&self, published: u64, cursor: &mut Option<u64>) {
        *cursor = Some(published);
        match self.store.events_since(published).await {
            Ok(events) => {
                for event in events {
                    *cursor = Some(event.seq);
                    // No subscribers is fine.
                    let _ = self.events.send(event);
                }
            }
            Err(e) => warn!(error = %e, "failed to read committed events"),
        }
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
