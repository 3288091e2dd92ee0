//! Collection handles.
//!
//! A [`CollectionHandle`] is an opaque token naming one collection of one
//! database. It borrows the database that issued it, so it cannot outlive
//! it, and it records the issuing database's [`DatabaseId`] so a backend can
//! reject a handle that belongs to a different database.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

static NEXT_DATABASE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an open database handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatabaseId(u64);

impl DatabaseId {
    /// Allocates a fresh id. Ids are never reused within a process.
    pub fn next() -> Self {
        DatabaseId(NEXT_DATABASE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db#{}", self.0)
    }
}

/// Opaque reference to a collection, valid for as long as the database
/// that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionHandle<'db> {
    owner: DatabaseId,
    slot: u32,
    _db: PhantomData<&'db ()>,
}

impl<'db> CollectionHandle<'db> {
    /// Issues a handle for `slot` on behalf of the database identified by
    /// `owner`.
    ///
    /// Only backends call this. The `'db` lifetime must be tied to the
    /// borrow of the issuing database.
    pub fn issue(owner: &'db DatabaseId, slot: u32) -> Self {
        Self {
            owner: *owner,
            slot,
            _db: PhantomData,
        }
    }

    /// The database this handle belongs to.
    pub fn owner(&self) -> DatabaseId {
        self.owner
    }

    /// Resolves the handle's slot, failing with `Invalid` if the handle was
    /// issued by a database other than `expected`.
    pub fn slot_for(&self, expected: DatabaseId) -> Result<usize> {
        if self.owner != expected {
            return Err(Error::invalid("collection handle belongs to another database")
                .with_detail(format!("handle owner {}, database {}", self.owner, expected)));
        }
        Ok(self.slot as usize)
    }
}

impl fmt::Debug for CollectionHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("owner", &self.owner)
            .field("slot", &self.slot)
            .finish()
    }
}
