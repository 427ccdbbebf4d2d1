//! SQLite implementation of the RecordStore trait.
//!
//! The durable backend. Uses rusqlite with bundled SQLite; every call runs on
//! the blocking pool via `tokio::task::spawn_blocking`, and every mutation is
//! a single transaction covering both the record and its audit event.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use cipherscore_core::{
    CiphertextHandle, Identity, LedgerEvent, LedgerEventKind, Record, RecordId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::RecordStore;

const RECORD_COLUMNS: &str = "record_id, label, ciphertext, public_factor1, public_factor2,
     notes, owner, created_at, revealed_value, verified, verified_at";

/// SQLite-based store implementation.
///
/// Thread-safe via an internal mutex around the single connection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        debug!(path = %path.as_ref().display(), "opening record store");
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut conn)
        })
        .await?
    }
}

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn blob32(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<[u8; 32]> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, "32-byte blob".into(), Type::Blob))
}

// Column order follows RECORD_COLUMNS.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let id: String = row.get(0)?;
    let id = RecordId::new(id).map_err(|e| conversion_error(0, Type::Text, e))?;

    Ok(Record {
        id,
        label: row.get(1)?,
        ciphertext: CiphertextHandle::from_bytes(blob32(row, 2)?),
        public_factor1: row.get::<_, i64>(3)? as u64,
        public_factor2: row.get::<_, i64>(4)? as u64,
        notes: row.get(5)?,
        owner: Identity::from_bytes(blob32(row, 6)?),
        created_at: row.get(7)?,
        revealed_value: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
        verified: row.get(9)?,
        verified_at: row.get(10)?,
    })
}

fn select_record(conn: &Connection, id: &RecordId) -> Result<Option<Record>> {
    conn.query_row(
        &format!("SELECT {} FROM records WHERE record_id = ?1", RECORD_COLUMNS),
        params![id.as_str()],
        row_to_record,
    )
    .optional()
    .map_err(StoreError::from)
}

fn append_event(conn: &Connection, at: i64, kind: &LedgerEventKind) -> Result<u64> {
    let seq: i64 = conn.query_row(
        "SELECT COALESCE(MAX(seq), 0) + 1 FROM ledger_events",
        [],
        |row| row.get(0),
    )?;

    let record_id = match kind {
        LedgerEventKind::Registered { id, .. } | LedgerEventKind::Verified { id, .. } => id,
    };

    let mut payload = Vec::new();
    ciborium::into_writer(kind, &mut payload)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    conn.execute(
        "INSERT INTO ledger_events (seq, record_id, at, kind) VALUES (?1, ?2, ?3, ?4)",
        params![seq, record_id.as_str(), at, payload],
    )?;

    Ok(seq as u64)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create(&self, record: &Record) -> Result<Record> {
        let record = record.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;

            // Present means a stored row with a non-empty identifier.
            let existing: Option<String> = tx
                .query_row(
                    "SELECT record_id FROM records WHERE record_id = ?1",
                    params![record.id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some_and(|id| !id.is_empty()) {
                return Err(StoreError::AlreadyExists(record.id));
            }

            tx.execute(
                &format!(
                    "INSERT INTO records ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    RECORD_COLUMNS
                ),
                params![
                    record.id.as_str(),
                    &record.label,
                    record.ciphertext.as_bytes().as_slice(),
                    record.public_factor1 as i64,
                    record.public_factor2 as i64,
                    &record.notes,
                    record.owner.as_bytes().as_slice(),
                    record.created_at,
                    record.revealed_value.map(|v| v as i64),
                    record.verified,
                    record.verified_at,
                ],
            )?;

            append_event(
                &tx,
                record.created_at,
                &LedgerEventKind::Registered {
                    id: record.id.clone(),
                    owner: record.owner,
                },
            )?;

            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn get(&self, id: &RecordId) -> Result<Record> {
        let id = id.clone();
        self.run(move |conn| select_record(conn, &id)?.ok_or(StoreError::NotFound(id)))
            .await
    }

    async fn contains(&self, id: &RecordId) -> Result<bool> {
        let id = id.clone();
        self.run(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM records WHERE record_id = ?1 AND record_id <> '')",
                params![id.as_str()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn mark_verified(&self, id: &RecordId, revealed_value: u64, at: i64) -> Result<Record> {
        let id = id.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let verified: Option<bool> = tx
                .query_row(
                    "SELECT verified FROM records WHERE record_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            match verified {
                None => return Err(StoreError::NotFound(id)),
                Some(true) => return Err(StoreError::AlreadyVerified(id)),
                Some(false) => {}
            }

            tx.execute(
                "UPDATE records SET revealed_value = ?2, verified = 1, verified_at = ?3
                 WHERE record_id = ?1 AND verified = 0",
                params![id.as_str(), revealed_value as i64, at],
            )?;

            append_event(
                &tx,
                at,
                &LedgerEventKind::Verified {
                    id: id.clone(),
                    revealed_value,
                },
            )?;

            let record = select_record(&tx, &id)?
                .ok_or_else(|| StoreError::InvalidData(format!("record {} vanished", id)))?;

            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn list_ids(&self) -> Result<Vec<RecordId>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT record_id FROM records ORDER BY position")?;
            let ids = stmt
                .query_map([], |row| {
                    let id: String = row.get(0)?;
                    RecordId::new(id).map_err(|e| conversion_error(0, Type::Text, e))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn len(&self) -> Result<usize> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<LedgerEvent>> {
        let after = i64::try_from(after_seq).unwrap_or(i64::MAX);

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, at, kind FROM ledger_events WHERE seq > ?1 ORDER BY seq",
            )?;
            let rows = stmt
                .query_map(params![after], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(seq, at, payload)| -> Result<LedgerEvent> {
                    let kind: LedgerEventKind = ciborium::from_reader(payload.as_slice())
                        .map_err(|e| StoreError::Serialization(e.to_string()))?;
                    Ok(LedgerEvent {
                        seq: seq as u64,
                        at,
                        kind,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .await
    }

    async fn last_event_seq(&self) -> Result<u64> {
        self.run(|conn| {
            let seq: i64 = conn.query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM ledger_events",
                [],
                |row| row.get(0),
            )?;
            Ok(seq as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherscore_core::RecordFields;

    fn make_record(id: &str, factor1: u64) -> Record {
        Record::registered(
            RecordId::new(id).unwrap(),
            RecordFields::new("Alice").factors(factor1, 0).notes("note"),
            CiphertextHandle::from_bytes([0xcd; 32]),
            Identity::from_bytes([0x02; 32]),
            1_234,
        )
    }

    #[tokio::test]
    async fn test_sqlite_create_get_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.last_event_seq().await.unwrap(), 0);
        // Full-range u64 metadata must survive the i64 column.
        let record = make_record("r1", u64::MAX);

        store.create(&record).await.unwrap();
        let retrieved = store.get(&record.id).await.unwrap();
        assert_eq!(retrieved, record);
    }

    #[tokio::test]
    async fn test_sqlite_duplicate_is_atomic() {
        let store = SqliteStore::open_memory().unwrap();
        store.create(&make_record("r2", 1)).await.unwrap();

        let err = store.create(&make_record("r2", 2)).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.events_since(0).await.unwrap().len(), 1);
        let id = RecordId::new("r2").unwrap();
        assert_eq!(store.get(&id).await.unwrap().public_factor1, 1);
    }

    #[tokio::test]
    async fn test_sqlite_mark_verified() {
        let store = SqliteStore::open_memory().unwrap();
        let record = make_record("r1", 10);
        store.create(&record).await.unwrap();

        let sealed = store
            .mark_verified(&record.id, u64::MAX - 1, 5_000)
            .await
            .unwrap();
        assert!(sealed.verified);
        assert_eq!(sealed.revealed_value, Some(u64::MAX - 1));
        assert_eq!(sealed.verified_at, Some(5_000));

        assert!(matches!(
            store.mark_verified(&record.id, 1, 6_000).await,
            Err(StoreError::AlreadyVerified(_))
        ));
        assert!(matches!(
            store
                .mark_verified(&RecordId::new("ghost").unwrap(), 1, 6_000)
                .await,
            Err(StoreError::NotFound(_))
        ));

        let events = store.events_since(0).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1].kind,
            LedgerEventKind::Verified {
                id: record.id.clone(),
                revealed_value: u64::MAX - 1,
            }
        );
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create(&make_record("b", 1)).await.unwrap();
            store.create(&make_record("a", 2)).await.unwrap();
            store
                .mark_verified(&RecordId::new("a").unwrap(), 42, 7)
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let ids: Vec<String> = store
            .list_ids()
            .await
            .unwrap()
            .into_iter()
            .map(RecordId::into_string)
            .collect();
        assert_eq!(ids, ["b", "a"]);

        let a = store.get(&RecordId::new("a").unwrap()).await.unwrap();
        assert_eq!(a.revealed_value, Some(42));
        assert_eq!(store.events_since(2).await.unwrap().len(), 1);
        assert_eq!(store.last_event_seq().await.unwrap(), 3);
    }
}
