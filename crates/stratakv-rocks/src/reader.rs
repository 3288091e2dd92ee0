//! Point lookups and ordered scans.

use rocksdb::DBRawIteratorWithThreadMode;
use stratakv_core::{
    CollectionHandle, Error, KeyValueDb, KeyValueIterator, KeyValueReader, Result,
};

use crate::db::{read_options, Engine, RocksDatabase};
use crate::status::map_status;

/// Stateless reader over the latest committed state.
///
/// Cheap to create; any number may be used from any number of threads.
#[derive(Debug, Clone, Copy)]
pub struct RocksReader<'db> {
    db: &'db RocksDatabase,
}

impl<'db> RocksReader<'db> {
    pub(crate) fn new(db: &'db RocksDatabase) -> Self {
        Self { db }
    }
}

impl<'db> KeyValueReader<'db> for RocksReader<'db> {
    type Iter = RocksIterator<'db>;

    fn get(&self, collection: CollectionHandle<'db>, key: &[u8]) -> Result<Vec<u8>> {
        self.db.get(collection, key)
    }

    fn iterator(
        &self,
        collection: CollectionHandle<'db>,
        start: &[u8],
    ) -> Result<RocksIterator<'db>> {
        let cf = self.db.column(collection)?;
        let engine: &'db Engine = self.db.engine();
        let mut raw = engine.raw_iterator_cf_opt(&cf, read_options());
        if start.is_empty() {
            raw.seek_to_first();
        } else {
            raw.seek(start);
        }
        raw.status().map_err(map_status)?;
        Ok(RocksIterator::new(raw))
    }
}

/// Forward cursor holding owned copies of the current entry.
pub struct RocksIterator<'db> {
    raw: DBRawIteratorWithThreadMode<'db, Engine>,
    current: Option<(Vec<u8>, Vec<u8>)>,
    error: Option<Error>,
}

impl<'db> RocksIterator<'db> {
    fn new(raw: DBRawIteratorWithThreadMode<'db, Engine>) -> Self {
        let mut iter = Self {
            raw,
            current: None,
            error: None,
        };
        iter.capture();
        iter
    }

    fn capture(&mut self) {
        self.current = match (self.raw.key(), self.raw.value()) {
            (Some(k), Some(v)) if self.raw.valid() => Some((k.to_vec(), v.to_vec())),
            _ => None,
        };
    }

    fn check_status(&mut self) -> Result<()> {
        if let Err(err) = self.raw.status() {
            let err = map_status(err);
            self.current = None;
            self.error = Some(err.clone());
            return Err(err);
        }
        Ok(())
    }
}

impl KeyValueIterator for RocksIterator<'_> {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_slice())
    }

    fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_slice())
    }

    fn next(&mut self) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.check_status()?;
        if self.current.is_none() {
            return Ok(());
        }
        self.raw.next();
        self.check_status()?;
        self.capture();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostResources;
    use crate::tuning::{TuningConfig, TuningPolicy};
    use crate::tuning::Compression;
    use std::fs::OpenOptions;
    use std::io::{Seek, SeekFrom, Write};
    use stratakv_core::{ErrorKind, OperatingMode};
    use tempfile::tempdir;

    fn seeded(path: &std::path::Path) -> RocksDatabase {
        let policy = TuningPolicy::new(TuningConfig::default(), HostResources::fixed(256 << 20, 2));
        let db = RocksDatabase::initialize_with_policy(path, &policy).unwrap();
        let coll = db.collection("default").unwrap();
        for key in [b"c", b"a", b"b"] {
            db.put(coll, key, key).unwrap();
        }
        db
    }

    fn keys(iter: &mut RocksIterator<'_>) -> Vec<Vec<u8>> {
        iter.collect_remaining()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect()
    }

    #[test]
    fn test_scan_from_start_and_seek() {
        let dir = tempdir().unwrap();
        let db = seeded(dir.path());
        let coll = db.collection("default").unwrap();
        let reader = db.current().unwrap();

        let mut all = reader.iterator(coll, b"").unwrap();
        assert_eq!(keys(&mut all), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

        let mut from_b = reader.iterator(coll, b"b").unwrap();
        assert_eq!(keys(&mut from_b), vec![b"b".to_vec(), b"c".to_vec()]);

        let mut past_end = reader.iterator(coll, b"zz").unwrap();
        assert!(!past_end.valid());
        assert!(past_end.key().is_none());
    }

    #[test]
    fn test_exhausted_iterator_stays_put() {
        let dir = tempdir().unwrap();
        let db = seeded(dir.path());
        let coll = db.collection("default").unwrap();
        let reader = db.current().unwrap();

        let mut iter = reader.iterator(coll, b"c").unwrap();
        assert_eq!(iter.key(), Some(&b"c"[..]));
        assert_eq!(iter.value(), Some(&b"c"[..]));
        iter.next().unwrap();
        assert!(!iter.valid());
        assert!(iter.value().is_none());
        iter.next().unwrap();
        assert!(!iter.valid());
    }

    #[test]
    fn test_iterator_on_empty_collection() {
        let dir = tempdir().unwrap();
        let db = seeded(dir.path());
        let empty = db.create_collection("empty").unwrap();
        let reader = db.current().unwrap();
        let iter = reader.iterator(empty, b"").unwrap();
        assert!(!iter.valid());
        assert_eq!(db.mode(), OperatingMode::Normal);
    }

    #[test]
    fn test_reader_sees_latest_writes() {
        let dir = tempdir().unwrap();
        let db = seeded(dir.path());
        let coll = db.collection("default").unwrap();
        let reader = db.current().unwrap();
        db.put(coll, b"a", b"updated").unwrap();
        assert_eq!(reader.get(coll, b"a").unwrap(), b"updated".to_vec());
    }

    fn uncompressed_policy() -> TuningPolicy {
        let config = TuningConfig::default()
            .with_compression(Compression::None)
            .with_block_size(4096);
        TuningPolicy::new(config, HostResources::fixed(256 << 20, 2))
    }

    /// Overwrites bytes a third of the way into the largest table file,
    /// which lands inside a data block.
    fn damage_largest_table(dir: &std::path::Path) {
        let (path, len) = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().map_or(false, |ext| ext == "sst"))
            .map(|entry| (entry.path(), entry.metadata().unwrap().len()))
            .max_by_key(|(_, len)| *len)
            .unwrap();
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(len / 3)).unwrap();
        file.write_all(&[0xA5; 64]).unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn test_corrupt_block_stops_iteration() {
        let dir = tempdir().unwrap();
        let policy = uncompressed_policy();
        {
            let db = RocksDatabase::initialize_with_policy(dir.path(), &policy).unwrap();
            let coll = db.collection("default").unwrap();
            for i in 0..2000u32 {
                let value = format!("value-{:08}-{}", i, "x".repeat(80));
                db.put(coll, format!("key{:06}", i).as_bytes(), value.as_bytes())
                    .unwrap();
            }
            db.close().unwrap();
        }
        damage_largest_table(dir.path());

        let db = RocksDatabase::open_with_policy(dir.path(), OperatingMode::ReadOnly, &policy)
            .unwrap();
        let coll = db.collection("default").unwrap();
        let reader = db.current().unwrap();
        let mut iter = reader.iterator(coll, b"").unwrap();
        assert!(iter.valid());

        let mut visited = 1;
        let err = loop {
            match iter.next() {
                Ok(()) => {
                    assert!(iter.valid(), "scan ended without reaching the damaged block");
                    visited += 1;
                }
                Err(err) => break err,
            }
        };
        assert!(visited < 2000);
        assert_eq!(err.kind(), ErrorKind::Failure);
        assert_eq!(err.message(), "corruption");
        assert!(!iter.valid());
        assert!(iter.key().is_none());

        let again = iter.next().unwrap_err();
        assert_eq!(again, err);
        assert!(!iter.valid());
    }
}
