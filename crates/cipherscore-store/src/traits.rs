//! Store trait: the abstract interface for record persistence.
//!
//! The ledger is storage-agnostic. Implementations include SQLite (durable)
//! and in-memory (tests, embedded use).

use std::sync::Arc;

use async_trait::async_trait;
use cipherscore_core::{LedgerEvent, Record, RecordId};

use crate::error::Result;

/// Async interface for the confidential record store.
///
/// # Guarantees
///
/// - **Uniqueness**: at most one record per id. `create` on a present id
///   fails with `AlreadyExists` and changes nothing.
/// - **Append-only order**: `list_ids` returns ids in creation order. Ids are
///   never reordered or removed.
/// - **Atomic writes**: `create` and `mark_verified` commit the record change
///   and its audit event together. Readers see all of it or none of it.
/// - **Seal once**: `mark_verified` succeeds at most once per record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new record and append a `Registered` event.
    ///
    /// A record is present when one is stored under the key and its stored
    /// identifier is non-empty.
    ///
    /// # Returns
    /// - The stored copy on success.
    /// - `AlreadyExists` if the id is present.
    async fn create(&self, record: &Record) -> Result<Record>;

    /// Get a record by id, or `NotFound`.
    async fn get(&self, id: &RecordId) -> Result<Record>;

    /// Check whether a record exists.
    async fn contains(&self, id: &RecordId) -> Result<bool>;

    /// Seal the reveal of a record and append a `Verified` event.
    ///
    /// # Returns
    /// - The updated record on success.
    /// - `NotFound` if absent.
    /// - `AlreadyVerified` if the record was already sealed.
    async fn mark_verified(&self, id: &RecordId, revealed_value: u64, at: i64) -> Result<Record>;

    // ─────────────────────────────────────────────────────────────────────────
    // Enumeration
    // ─────────────────────────────────────────────────────────────────────────

    /// All record ids in creation order.
    async fn list_ids(&self) -> Result<Vec<RecordId>>;

    /// Number of records.
    async fn len(&self) -> Result<usize>;

    // ─────────────────────────────────────────────────────────────────────────
    // Audit Log
    // ─────────────────────────────────────────────────────────────────────────

    /// Audit events with `seq > after_seq`, ascending.
    async fn events_since(&self, after_seq: u64) -> Result<Vec<LedgerEvent>>;

    /// Seq of the newest audit event, or 0 if the log is empty.
    async fn last_event_seq(&self) -> Result<u64>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn create(&self, record: &Record) -> Result<Record> {
        (**self).create(record).await
    }

    async fn get(&self, id: &RecordId) -> Result<Record> {
        (**self).get(id).await
    }

    async fn contains(&self, id: &RecordId) -> Result<bool> {
        (**self).contains(id).await
    }

    async fn mark_verified(&self, id: &RecordId, revealed_value: u64, at: i64) -> Result<Record> {
        (**self).mark_verified(id, revealed_value, at).await
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>> {
        (**self).list_ids().await
    }

    async fn len(&self) -> Result<usize> {
        (**self).len().await
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<LedgerEvent>> {
        (**self).events_since(after_seq).await
    }

    async fn last_event_seq(&self) -> Result<u64> {
        (**self).last_event_seq().await
    }
}
