//! Ledger configuration.

use cipherscore_core::{FieldLimits, Identity};

/// Configuration for the Ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Identity the engine authorizes as a holder of every registered handle.
    pub ledger_identity: Identity,
    /// Buffer size of the live event channel. Slow subscribers past this lag.
    pub event_capacity: usize,
    /// Limits on caller-supplied fields.
    pub limits: FieldLimits,
}

impl LedgerConfig {
    pub fn new(ledger_identity: Identity) -> Self {
        Self {
            ledger_identity,
            ..Self::default()
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ledger_identity: Identity::ZERO,
            event_capacity: 256,
            limits: FieldLimits::default(),
        }
    }
}
