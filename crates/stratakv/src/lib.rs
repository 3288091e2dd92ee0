//! # stratakv
//!
//! An ordered, persistent key-value store with named collections, atomic
//! write batches and three operating modes, built on RocksDB.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stratakv::{KeyValueBatch, KeyValueDb, KeyValueIterator, KeyValueReader, OperatingMode};
//!
//! fn main() -> stratakv::Result<()> {
//!     let db = stratakv::initialize("./my_database")?;
//!     let users = db.create_collection("users")?;
//!
//!     // Single put: WAL on, no sync.
//!     db.put(users, b"user:1", b"Alice")?;
//!
//!     // Batch: all or nothing, WAL synced on commit.
//!     let mut batch = db.begin_writes()?;
//!     batch.put(users, b"user:2", b"Bob")?;
//!     batch.put(users, b"user:3", b"Carol")?;
//!     batch.commit()?;
//!
//!     // Ordered scan from a start key.
//!     let reader = db.current()?;
//!     let mut iter = reader.iterator(users, b"user:2")?;
//!     while let (Some(key), Some(value)) = (iter.key(), iter.value()) {
//!         println!("{} = {}", String::from_utf8_lossy(key), String::from_utf8_lossy(value));
//!         iter.next()?;
//!     }
//!     drop(iter);
//!
//!     db.close()?;
//!
//!     let db = stratakv::open("./my_database", OperatingMode::ReadOnly)?;
//!     assert_eq!(db.get(db.collection("users")?, b"user:1")?, b"Alice");
//!     Ok(())
//! }
//! ```
//!
//! ## Operating Modes
//!
//! | mode       | single put     | batch commit   | on close                        |
//! |------------|----------------|----------------|---------------------------------|
//! | `Normal`   | WAL            | WAL + sync     | sync WAL, flush                 |
//! | `BulkLoad` | no WAL         | no WAL         | compact all, sync WAL, flush    |
//! | `ReadOnly` | `Invalid`      | `Invalid`      | nothing                         |
//!
//! `BulkLoad` data is durable only after a clean close, and that close
//! compacts every collection, which can take a long time.

#![warn(missing_docs)]

use std::path::Path;

pub mod logging;

pub use stratakv_core::{
    CollectionHandle, DatabaseId, Error, ErrorKind, KeyValueBatch, KeyValueDb, KeyValueIterator,
    KeyValueReader, OperatingMode, Result, ShutdownStep, DEFAULT_COLLECTION,
};
pub use stratakv_rocks::{
    Compression, HostResources, RocksDatabase, RocksIterator, RocksReader, RocksWriteBatch,
    Tuning, TuningConfig, TuningPolicy, WriteDurability, WritePolicy,
};

/// The database type of the default backend.
pub type Database = RocksDatabase;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates a new database at `path`, returning it open in
/// [`OperatingMode::Normal`].
///
/// Fails with [`ErrorKind::Exists`] if `path` already holds one.
pub fn initialize(path: impl AsRef<Path>) -> Result<Database> {
    Database::initialize(path)
}

/// Opens the existing database at `path` in `mode`.
///
/// Fails with [`ErrorKind::NotFound`] if `path` holds no database.
pub fn open(path: impl AsRef<Path>, mode: OperatingMode) -> Result<Database> {
    Database::open(path, mode)
}

/// Deletes the database at `path`. A missing path is not an error.
pub fn destroy(path: impl AsRef<Path>) -> Result<()> {
    stratakv_rocks::destroy(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_entry_points() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        assert_eq!(
            open(&path, OperatingMode::Normal).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        initialize(&path).unwrap().close().unwrap();
        assert_eq!(initialize(&path).unwrap_err().kind(), ErrorKind::Exists);

        let db = open(&path, OperatingMode::ReadOnly).unwrap();
        assert_eq!(db.mode(), OperatingMode::ReadOnly);
        db.close().unwrap();

        destroy(&path).unwrap();
        assert!(!path.exists());
    }
}
