// Common test utilities for stratakv integration tests

use std::path::{Path, PathBuf};

use stratakv::{
    CollectionHandle, Database, HostResources, KeyValueBatch, KeyValueDb, KeyValueIterator,
    KeyValueReader, OperatingMode, TuningConfig, TuningPolicy,
};
use tempfile::TempDir;

/// Test fixture owning a temporary directory for one database.
pub struct DbFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
}

impl DbFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("db");
        Self { temp_dir, db_path }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Small host so block cache and bulk write buffers stay modest.
    pub fn policy() -> TuningPolicy {
        TuningPolicy::new(
            TuningConfig::default().with_memtable_budget(32 << 20),
            HostResources::fixed(512 << 20, 2),
        )
    }

    pub fn initialize(&self) -> Database {
        Database::initialize_with_policy(&self.db_path, &Self::policy())
            .expect("Failed to initialize database")
    }

    pub fn open(&self, mode: OperatingMode) -> Database {
        Database::open_with_policy(&self.db_path, mode, &Self::policy())
            .expect("Failed to open database")
    }

    /// Creates the database with the given collections, then closes it.
    #[allow(dead_code)]
    pub fn seed(&self, collections: &[&str]) {
        let db = self.initialize();
        for name in collections {
            db.create_collection(name)
                .expect("Failed to create collection");
        }
        db.close().expect("Failed to close database");
    }
}

impl Default for DbFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects every entry from `start` onwards through a fresh reader.
#[allow(dead_code)]
pub fn scan<'a, D: KeyValueDb>(
    db: &'a D,
    collection: CollectionHandle<'a>,
    start: &[u8],
) -> Vec<(Vec<u8>, Vec<u8>)> {
    let reader = db.current().expect("Failed to create reader");
    let mut iter = reader
        .iterator(collection, start)
        .expect("Failed to create iterator");
    iter.collect_remaining().expect("Iteration failed")
}

/// Keys only, as UTF-8 strings.
#[allow(dead_code)]
pub fn scan_keys<'a, D: KeyValueDb>(
    db: &'a D,
    collection: CollectionHandle<'a>,
    start: &[u8],
) -> Vec<String> {
    scan(db, collection, start)
        .into_iter()
        .map(|(k, _)| String::from_utf8(k).expect("non-UTF-8 key"))
        .collect()
}

/// Writes `count` numbered keys through one batch.
#[allow(dead_code)]
pub fn write_numbered<'a, D: KeyValueDb>(
    db: &'a D,
    collection: CollectionHandle<'a>,
    prefix: &str,
    count: usize,
) {
    let mut batch = db.begin_writes().expect("Failed to begin batch");
    for i in 0..count {
        let key = format!("{}{:06}", prefix, i);
        let value = format!("value{}", i);
        batch
            .put(collection, key.as_bytes(), value.as_bytes())
            .expect("Failed to stage put");
    }
    batch.commit().expect("Failed to commit batch");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_paths() {
        let fixture = DbFixture::new();
        assert!(fixture.temp_dir.path().exists());
        assert!(!fixture.path().exists());
    }
}
