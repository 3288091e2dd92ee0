//! # stratakv core
//!
//! Engine-neutral types shared by every stratakv backend: the error
//! taxonomy, operating modes and their shutdown plans, collection handles,
//! and the capability traits a backend implements.
//!
//! **Note:** This is an internal implementation crate. Use the `stratakv`
//! crate instead.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod handle;
pub mod kv;
pub mod mode;

pub use error::{Error, ErrorKind, Result};
pub use handle::{CollectionHandle, DatabaseId};
pub use kv::{KeyValueBatch, KeyValueDb, KeyValueIterator, KeyValueReader};
pub use mode::{OperatingMode, ShutdownStep};

/// Name of the namespace every database has from creation.
pub const DEFAULT_COLLECTION: &str = "default";
