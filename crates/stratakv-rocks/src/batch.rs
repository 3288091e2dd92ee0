//! Atomic write batches.

use rocksdb::WriteBatch;
use stratakv_core::{CollectionHandle, Error, KeyValueBatch, KeyValueDb, Result};
use tracing::trace;

use crate::db::RocksDatabase;
use crate::status::map_status;
use crate::tuning::WriteDurability;

/// Puts staged in memory and applied together by [`KeyValueBatch::commit`].
///
/// The durability policy is fixed when the batch is created. Dropping a
/// batch without committing discards it.
pub struct RocksWriteBatch<'db> {
    db: &'db RocksDatabase,
    durability: WriteDurability,
    staged: WriteBatch,
}

impl<'db> RocksWriteBatch<'db> {
    pub(crate) fn new(db: &'db RocksDatabase, durability: WriteDurability) -> Self {
        Self {
            db,
            durability,
            staged: WriteBatch::default(),
        }
    }

    /// Durability the commit will use.
    pub fn durability(&self) -> WriteDurability {
        self.durability
    }
}

impl<'db> KeyValueBatch<'db> for RocksWriteBatch<'db> {
    fn put(&mut self, collection: CollectionHandle<'db>, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.db.column(collection)?;
        self.staged.put_cf(&cf, key, value);
        Ok(())
    }

    fn len(&self) -> usize {
        self.staged.len()
    }

    fn commit(self) -> Result<()> {
        self.db.mode().ensure_writable("commit")?;
        let opts = self
            .durability
            .write_options()
            .ok_or_else(|| Error::invalid("writes are disabled"))?;
        trace!(puts = self.staged.len(), "commit batch");
        self.db
            .engine()
            .write_opt(self.staged, &opts)
            .map_err(map_status)
    }
}
