//! Audit events.
//!
//! The ledger's only notification mechanism. Events are appended in the same
//! atomic write as the state change they describe and are never removed.

use serde::{Deserialize, Serialize};

use crate::types::{Identity, RecordId};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEventKind {
    /// A record was registered by `owner`.
    Registered { id: RecordId, owner: Identity },
    /// A record's plaintext was proven and sealed.
    Verified { id: RecordId, revealed_value: u64 },
}

/// An entry in the append-only audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the log, starting at 1.
    pub seq: u64,
    /// When the event was committed (Unix ms).
    pub at: i64,
    pub kind: LedgerEventKind,
}

impl LedgerEvent {
    /// The record this event is about.
    pub fn record_id(&self) -> &RecordId {
        match &self.kind {
            LedgerEventKind::Registered { id, .. } | LedgerEventKind::Verified { id, .. } => id,
        }
    }
}
