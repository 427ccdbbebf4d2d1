//! Database schema migrations for SQLite.
//!
//! Versioned migrations: each one is a SQL batch that moves the schema from
//! version N to N+1, recorded in `schema_migrations`.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// Idempotent: running it on an up-to-date database does nothing.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            debug!(version, "applying schema migration");
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: records and the audit log.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Confidential records. `position` is the append-only enumeration order.
        CREATE TABLE records (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id TEXT NOT NULL UNIQUE CHECK (length(record_id) > 0),
            label TEXT NOT NULL,
            ciphertext BLOB NOT NULL,          -- 32 bytes, engine handle
            public_factor1 INTEGER NOT NULL,   -- u64 bit pattern
            public_factor2 INTEGER NOT NULL,   -- u64 bit pattern
            notes TEXT NOT NULL,
            owner BLOB NOT NULL,               -- 32 bytes
            created_at INTEGER NOT NULL,       -- Unix ms
            revealed_value INTEGER,            -- u64 bit pattern, NULL until verified
            verified INTEGER NOT NULL DEFAULT 0,
            verified_at INTEGER                -- Unix ms, NULL until verified
        );

        -- Append-only audit log.
        CREATE TABLE ledger_events (
            seq INTEGER PRIMARY KEY,           -- dense, starting at 1
            record_id TEXT NOT NULL,
            at INTEGER NOT NULL,
            kind BLOB NOT NULL                 -- CBOR LedgerEventKind
        );

        CREATE INDEX idx_ledger_events_record ON ledger_events(record_id);
        "#,
    )?;

    Ok(())
}

/// Migration v2: enforce write-once rules inside the database as well.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TRIGGER records_fields_immutable
        BEFORE UPDATE OF record_id, label, ciphertext, public_factor1, public_factor2,
                         notes, owner, created_at, position
        ON records
        BEGIN
            SELECT RAISE(ABORT, 'record fields are immutable');
        END;

        CREATE TRIGGER records_seal_once
        BEFORE UPDATE OF revealed_value, verified, verified_at ON records
        WHEN OLD.verified = 1
        BEGIN
            SELECT RAISE(ABORT, 'record already verified');
        END;

        CREATE TRIGGER records_append_only
        BEFORE DELETE ON records
        BEGIN
            SELECT RAISE(ABORT, 'records are append-only');
        END;

        CREATE TRIGGER ledger_events_append_only
        BEFORE DELETE ON ledger_events
        BEGIN
            SELECT RAISE(ABORT, 'audit log is append-only');
        END;

        CREATE TRIGGER ledger_events_immutable
        BEFORE UPDATE ON ledger_events
        BEGIN
            SELECT RAISE(ABORT, 'audit log is append-only');
        END;
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
