//! Capability traits implemented by storage backends.
//!
//! Readers, iterators and batches all borrow the database that produced
//! them (`'db`), so the compiler refuses any program that would use one
//! after its database is gone.

use crate::error::Result;
use crate::handle::CollectionHandle;
use crate::mode::OperatingMode;

/// An open database with named collections.
pub trait KeyValueDb: Sync {
    /// Point-lookup and iterator factory.
    type Reader<'db>: KeyValueReader<'db>
    where
        Self: 'db;

    /// Atomic multi-put staging area.
    type Batch<'db>: KeyValueBatch<'db>
    where
        Self: 'db;

    /// The mode this handle was opened in.
    fn mode(&self) -> OperatingMode;

    /// Looks up an existing collection by name.
    ///
    /// Fails with `NotFound` when no collection has that name.
    fn collection(&self, name: &str) -> Result<CollectionHandle<'_>>;

    /// Creates a collection and returns its handle.
    ///
    /// Fails with `Exists` if the name is taken and with `Invalid` on a
    /// read-only database.
    fn create_collection(&self, name: &str) -> Result<CollectionHandle<'_>>;

    /// Names of every collection, in creation order.
    fn collections(&self) -> Vec<String>;

    /// A reader over the latest committed state.
    fn current(&self) -> Result<Self::Reader<'_>>;

    /// An empty batch bound to this database's batch durability policy.
    fn begin_writes(&self) -> Result<Self::Batch<'_>>;

    /// Reads one key. Absent keys fail with `NotFound`.
    fn get(&self, collection: CollectionHandle<'_>, key: &[u8]) -> Result<Vec<u8>>;

    /// Writes one key under the single-put durability policy.
    fn put(&self, collection: CollectionHandle<'_>, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Stateless read access to a database.
pub trait KeyValueReader<'db>: Sync {
    /// Forward cursor produced by [`KeyValueReader::iterator`].
    type Iter: KeyValueIterator + 'db;

    /// Reads one key. Absent keys fail with `NotFound`.
    fn get(&self, collection: CollectionHandle<'db>, key: &[u8]) -> Result<Vec<u8>>;

    /// Opens a cursor positioned at the first key `>= start`, or at the
    /// first key of the collection when `start` is empty.
    fn iterator(&self, collection: CollectionHandle<'db>, start: &[u8]) -> Result<Self::Iter>;
}

/// Forward-only ordered cursor.
pub trait KeyValueIterator {
    /// True while the cursor rests on an entry.
    fn valid(&self) -> bool;

    /// Current key, or `None` once the cursor is exhausted or failed.
    fn key(&self) -> Option<&[u8]>;

    /// Current value, or `None` once the cursor is exhausted or failed.
    fn value(&self) -> Option<&[u8]>;

    /// Advances to the next entry.
    ///
    /// An error recorded by an earlier step is returned again without
    /// moving the cursor.
    fn next(&mut self) -> Result<()>;

    /// Drains the remaining entries into owned pairs.
    fn collect_remaining(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        while let (Some(key), Some(value)) = (self.key(), self.value()) {
            out.push((key.to_vec(), value.to_vec()));
            self.next()?;
        }
        Ok(out)
    }
}

/// Staged puts applied atomically by [`KeyValueBatch::commit`].
pub trait KeyValueBatch<'db> {
    /// Stages a put. Nothing reaches the engine until commit.
    fn put(&mut self, collection: CollectionHandle<'db>, key: &[u8], value: &[u8]) -> Result<()>;

    /// Number of staged puts.
    fn len(&self) -> usize;

    /// True when nothing is staged.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies every staged put atomically, or none of them.
    fn commit(self) -> Result<()>
    where
        Self: Sized;
}
