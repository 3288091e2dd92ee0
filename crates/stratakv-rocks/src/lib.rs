//! # stratakv RocksDB backend
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of stratakv.**
//!
//! Users should depend on the main [`stratakv`](https://crates.io/crates/stratakv) crate
//! instead, which provides the stable public API. This crate's API may change
//! without notice between minor versions.
//!
//! ---
//!
//! Implements the `stratakv-core` capability traits on top of RocksDB:
//!
//! - **Tuning**: per-mode engine options resolved from host resources
//! - **Lifecycle**: initialize, open, mode-dependent shutdown, destroy
//! - **Reads**: point lookups and forward iterators with owned entries
//! - **Writes**: single puts and atomic batches with per-mode durability
//!
//! ## Operating modes
//!
//! ```text
//! Normal    put: WAL          batch: WAL + sync   close: sync WAL, flush
//! BulkLoad  put: no WAL       batch: no WAL       close: compact, sync WAL, flush
//! ReadOnly  writes rejected                       close: nothing
//! ```

pub mod batch;
pub mod db;
pub mod host;
pub mod reader;
pub mod status;
pub mod tuning;

pub use batch::RocksWriteBatch;
pub use db::{destroy, RocksDatabase};
pub use host::HostResources;
pub use reader::{RocksIterator, RocksReader};
pub use status::map_status;
pub use tuning::{
    CollectionTuning, Compression, DatabaseTuning, MemtableKind, Tuning, TuningConfig,
    TuningPolicy, WriteBufferTuning, WriteDurability, WritePolicy,
};
