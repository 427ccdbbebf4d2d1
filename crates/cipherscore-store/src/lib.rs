//! # Cipherscore Store
//!
//! The Record Store: keyed, append-only storage for confidential records and
//! the audit log, behind the [`RecordStore`] trait.
//!
//! ## Key Types
//!
//! - [`RecordStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - Arena-style in-memory storage
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cipherscore_store::{RecordStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     for id in store.list_ids().await.unwrap() {
//!         let record = store.get(&id).await.unwrap();
//!         println!("{} verified={}", record.id, record.verified);
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Unique ids**: creating an existing id returns `AlreadyExists`
//! - **Write-once reveal**: a second `mark_verified` returns `AlreadyVerified`
//! - **Append-only**: records and events are never deleted or reordered
//! - **Atomic**: each mutation commits the record change and its event together

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::RecordStore;
