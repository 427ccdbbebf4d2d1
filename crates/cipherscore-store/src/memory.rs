//! In-memory implementation of the RecordStore trait.
//!
//! Arena layout: an id -> slot index plus a dense, append-only vector of
//! records. Slot order is creation order, so enumeration needs no separate
//! id list. Everything sits behind one `RwLock`, which makes each write
//! atomic for readers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use cipherscore_core::{LedgerEvent, LedgerEventKind, Record, RecordId};

use crate::error::{Result, StoreError};
use crate::traits::RecordStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Record id -> slot in `records`.
    index: HashMap<RecordId, usize>,

    /// Records in creation order.
    records: Vec<Record>,

    /// Audit log. `events[i].seq == i + 1`.
    events: Vec<LedgerEvent>,
}

impl MemoryStoreInner {
    fn slot(&self, id: &RecordId) -> Option<usize> {
        self.index
            .get(id)
            .copied()
            .filter(|&slot| !self.records[slot].id.as_str().is_empty())
    }

    fn push_event(&mut self, at: i64, kind: LedgerEventKind) {
        let seq = self.events.len() as u64 + 1;
        self.events.push(LedgerEvent { seq, at, kind });
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: &Record) -> Result<Record> {
        let mut inner = self.write()?;

        if inner.slot(&record.id).is_some() {
            return Err(StoreError::AlreadyExists(record.id.clone()));
        }

        let slot = inner.records.len();
        inner.records.push(record.clone());
        inner.index.insert(record.id.clone(), slot);
        inner.push_event(
            record.created_at,
            LedgerEventKind::Registered {
                id: record.id.clone(),
                owner: record.owner,
            },
        );

        Ok(record.clone())
    }

    async fn get(&self, id: &RecordId) -> Result<Record> {
        let inner = self.read()?;
        inner
            .slot(id)
            .map(|slot| inner.records[slot].clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn contains(&self, id: &RecordId) -> Result<bool> {
        Ok(self.read()?.slot(id).is_some())
    }

    async fn mark_verified(&self, id: &RecordId, revealed_value: u64, at: i64) -> Result<Record> {
        let mut inner = self.write()?;

        let slot = inner
            .slot(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if !inner.records[slot].seal(revealed_value, at) {
            return Err(StoreError::AlreadyVerified(id.clone()));
        }

        inner.push_event(
            at,
            LedgerEventKind::Verified {
                id: id.clone(),
                revealed_value,
            },
        );

        Ok(inner.records[slot].clone())
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>> {
        let inner = self.read()?;
        Ok(inner.records.iter().map(|r| r.id.clone()).collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<LedgerEvent>> {
        let inner = self.read()?;
        let start = usize::try_from(after_seq)
            .unwrap_or(usize::MAX)
            .min(inner.events.len());
        Ok(inner.events[start..].to_vec())
    }

    async fn last_event_seq(&self) -> Result<u64> {
        Ok(self.read()?.events.len() as u64)
    }
}
