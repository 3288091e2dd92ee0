//! Database lifecycle over RocksDB.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use rocksdb::{
    BoundColumnFamily, Cache, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options,
    ReadOptions,
};
use stratakv_core::{
    CollectionHandle, DatabaseId, Error, ErrorKind, KeyValueDb, OperatingMode, Result,
    ShutdownStep, DEFAULT_COLLECTION,
};
use tracing::{debug, info, trace, warn};

use crate::batch::RocksWriteBatch;
use crate::host::HostResources;
use crate::reader::RocksReader;
use crate::status::map_status;
use crate::tuning::{Tuning, TuningConfig, TuningPolicy};

pub(crate) type Engine = DBWithThreadMode<MultiThreaded>;

/// File every RocksDB database directory contains.
const CURRENT_MARKER: &str = "CURRENT";

/// Names of the open collections. A handle's slot indexes `names`.
#[derive(Debug, Default)]
struct CollectionTable {
    names: Vec<String>,
}

impl CollectionTable {
    fn slot(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// A RocksDB database opened in one [`OperatingMode`].
///
/// Dropping the handle runs the mode's shutdown plan; call
/// [`RocksDatabase::close`] to observe its outcome. In
/// [`OperatingMode::BulkLoad`] the plan compacts every collection, so
/// closing can take a long time.
pub struct RocksDatabase {
    // Drop order: the collection table goes before the engine.
    table: RwLock<CollectionTable>,
    db: Engine,
    cache: Cache,
    tuning: Tuning,
    path: PathBuf,
    id: DatabaseId,
    shut_down: AtomicBool,
}

impl RocksDatabase {
    /// Creates a new database at `path` with the default tuning.
    ///
    /// Fails with `Exists` if `path` already holds a database.
    pub fn initialize(path: impl AsRef<Path>) -> Result<Self> {
        Self::initialize_with_policy(path, &TuningPolicy::detect())
    }

    /// Creates a new database with caller knobs on the detected host.
    pub fn initialize_with_config(path: impl AsRef<Path>, config: TuningConfig) -> Result<Self> {
        Self::initialize_with_policy(path, &TuningPolicy::new(config, HostResources::detect()))
    }

    /// Creates a new database with an explicit policy.
    ///
    /// The new handle is in [`OperatingMode::Normal`] and holds only the
    /// default collection.
    pub fn initialize_with_policy(path: impl AsRef<Path>, policy: &TuningPolicy) -> Result<Self> {
        let path = path.as_ref();
        if path.join(CURRENT_MARKER).exists() {
            return Err(Error::exists("database already exists").with_detail(display(path)));
        }
        std::fs::create_dir_all(path)?;

        let tuning = policy.resolve(OperatingMode::Normal);
        let cache = Cache::new_lru_cache(tuning.collection.block_cache_bytes);
        let mut opts = tuning.db_options(&cache)?;
        opts.create_if_missing(true);
        opts.set_error_if_exists(true);

        let descriptors = vec![ColumnFamilyDescriptor::new(
            DEFAULT_COLLECTION,
            tuning.collection.to_options(&cache),
        )];
        let db = Engine::open_cf_descriptors(&opts, path, descriptors)
            .map_err(|err| exists_if_created_meanwhile(map_status(err), path))?;

        info!(path = %path.display(), "initialized database");
        Ok(Self::assemble(
            db,
            cache,
            tuning,
            path,
            vec![DEFAULT_COLLECTION.to_string()],
        ))
    }

    /// Opens an existing database in `mode` with the default tuning.
    ///
    /// Fails with `NotFound` if `path` holds no database.
    pub fn open(path: impl AsRef<Path>, mode: OperatingMode) -> Result<Self> {
        Self::open_with_policy(path, mode, &TuningPolicy::detect())
    }

    /// Opens an existing database with caller knobs on the detected host.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        mode: OperatingMode,
        config: TuningConfig,
    ) -> Result<Self> {
        Self::open_with_policy(path, mode, &TuningPolicy::new(config, HostResources::detect()))
    }

    /// Opens an existing database with an explicit policy.
    ///
    /// Every collection on disk is opened with the mode's collection
    /// tuning. [`OperatingMode::ReadOnly`] opens the engine strictly
    /// read-only.
    pub fn open_with_policy(
        path: impl AsRef<Path>,
        mode: OperatingMode,
        policy: &TuningPolicy,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.join(CURRENT_MARKER).exists() {
            return Err(Error::not_found("database does not exist").with_detail(display(path)));
        }

        let tuning = policy.resolve(mode);
        let cache = Cache::new_lru_cache(tuning.collection.block_cache_bytes);
        let mut opts = tuning.db_options(&cache)?;
        opts.create_if_missing(false);

        let names = Engine::list_cf(&opts, path).map_err(map_status)?;
        let descriptors: Vec<ColumnFamilyDescriptor> = names
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, tuning.collection.to_options(&cache)))
            .collect();

        let db = if mode.is_read_only() {
            Engine::open_cf_descriptors_read_only(&opts, path, descriptors, false)
        } else {
            Engine::open_cf_descriptors(&opts, path, descriptors)
        }
        .map_err(map_status)?;

        info!(
            path = %path.display(),
            %mode,
            collections = names.len(),
            "opened database"
        );
        debug!(tuning = ?tuning, "resolved tuning");
        Ok(Self::assemble(db, cache, tuning, path, names))
    }

    fn assemble(
        db: Engine,
        cache: Cache,
        tuning: Tuning,
        path: &Path,
        mut names: Vec<String>,
    ) -> Self {
        if !names.iter().any(|n| n == DEFAULT_COLLECTION) {
            names.insert(0, DEFAULT_COLLECTION.to_string());
        }
        Self {
            table: RwLock::new(CollectionTable { names }),
            db,
            cache,
            tuning,
            path: path.to_path_buf(),
            id: DatabaseId::next(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Directory holding the database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The tuning this handle was opened with.
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Identity checked against every collection handle.
    pub fn id(&self) -> DatabaseId {
        self.id
    }

    /// Runs the shutdown plan and releases the database.
    ///
    /// Every step runs even if an earlier one fails; the first failure is
    /// returned.
    pub fn close(self) -> Result<()> {
        let result = self.shutdown();
        match &result {
            Ok(()) => info!(path = %self.path.display(), mode = %self.mode(), "closed database"),
            Err(err) => warn!(path = %self.path.display(), error = %err, "close failed"),
        }
        result
    }

    fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let names = self.collection_names()?;
        let mut first_error = None;
        for step in self.mode().shutdown_plan() {
            if let Err(err) = self.run_step(*step, &names) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run_step(&self, step: ShutdownStep, names: &[String]) -> Result<()> {
        debug!(%step, path = %self.path.display(), "shutdown step");
        match step {
            ShutdownStep::CompactAll => {
                warn!(
                    path = %self.path.display(),
                    collections = names.len(),
                    "compacting bulk-loaded data, this may take a long time"
                );
                self.for_each_column(names, |cf| {
                    self.db.compact_range_cf::<&[u8], &[u8]>(cf, None, None);
                    Ok(())
                })
            }
            ShutdownStep::SyncWal => self.db.flush_wal(true).map_err(map_status),
            ShutdownStep::FlushAll => {
                self.for_each_column(names, |cf| self.db.flush_cf(cf).map_err(map_status))
            }
        }
    }

    /// Runs `f` on every named collection, continuing past failures, and
    /// returns the first one.
    fn for_each_column<F>(&self, names: &[String], mut f: F) -> Result<()>
    where
        F: FnMut(&Arc<BoundColumnFamily<'_>>) -> Result<()>,
    {
        let mut first_error = None;
        for name in names {
            let outcome = self.column_named(name).and_then(|cf| f(&cf));
            if let Err(err) = outcome {
                warn!(collection = %name, error = %err, "shutdown step failed for collection");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn collection_names(&self) -> Result<Vec<String>> {
        Ok(self.read_table()?.names.clone())
    }

    fn read_table(&self) -> Result<std::sync::RwLockReadGuard<'_, CollectionTable>> {
        self.table.read().map_err(|_| poisoned())
    }

    fn column_named(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db.cf_handle(name).ok_or_else(|| {
            Error::failure("collection missing from engine").with_detail(name.to_string())
        })
    }

    /// Resolves a handle to the engine's column family, rejecting handles
    /// issued by another database.
    pub(crate) fn column(
        &self,
        collection: CollectionHandle<'_>,
    ) -> Result<Arc<BoundColumnFamily<'_>>> {
        let slot = collection.slot_for(self.id)?;
        let table = self.read_table()?;
        let name = table
            .names
            .get(slot)
            .ok_or_else(|| Error::invalid("unknown collection handle"))?;
        self.column_named(name)
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.db
    }

    fn issue(&self, slot: usize) -> Result<CollectionHandle<'_>> {
        let slot = u32::try_from(slot).map_err(|_| Error::failure("too many collections"))?;
        Ok(CollectionHandle::issue(&self.id, slot))
    }
}

/// Read options for every lookup and scan: latest state, checksums on.
pub(crate) fn read_options() -> ReadOptions {
    let mut opts = ReadOptions::default();
    opts.set_verify_checksums(true);
    opts
}

impl KeyValueDb for RocksDatabase {
    type Reader<'db> = RocksReader<'db>;
    type Batch<'db> = RocksWriteBatch<'db>;

    fn mode(&self) -> OperatingMode {
        self.tuning.mode
    }

    fn collection(&self, name: &str) -> Result<CollectionHandle<'_>> {
        let slot = self
            .read_table()?
            .slot(name)
            .ok_or_else(|| Error::not_found("collection does not exist").with_detail(name))?;
        self.issue(slot)
    }

    fn create_collection(&self, name: &str) -> Result<CollectionHandle<'_>> {
        self.mode().ensure_writable("create_collection")?;
        if name.is_empty() {
            return Err(Error::invalid("collection name must not be empty"));
        }

        let mut table = self.table.write().map_err(|_| poisoned())?;
        if table.slot(name).is_some() {
            return Err(Error::exists("collection already exists").with_detail(name));
        }
        let opts: Options = self.tuning.collection.to_options(&self.cache);
        self.db.create_cf(name, &opts).map_err(map_status)?;
        table.names.push(name.to_string());
        let slot = table.names.len() - 1;
        drop(table);

        debug!(collection = name, path = %self.path.display(), "created collection");
        self.issue(slot)
    }

    fn collections(&self) -> Vec<String> {
        let table = self.table.read().unwrap_or_else(|poison| {
            warn!(path = %self.path.display(), "collection table lock poisoned");
            poison.into_inner()
        });
        table.names.clone()
    }

    fn current(&self) -> Result<RocksReader<'_>> {
        Ok(RocksReader::new(self))
    }

    fn begin_writes(&self) -> Result<RocksWriteBatch<'_>> {
        Ok(RocksWriteBatch::new(self, self.tuning.writes.batch))
    }

    fn get(&self, collection: CollectionHandle<'_>, key: &[u8]) -> Result<Vec<u8>> {
        let cf = self.column(collection)?;
        trace!(key_len = key.len(), "get");
        self.db
            .get_cf_opt(&cf, key, &read_options())
            .map_err(map_status)?
            .ok_or_else(|| Error::not_found("key not found"))
    }

    fn put(&self, collection: CollectionHandle<'_>, key: &[u8], value: &[u8]) -> Result<()> {
        self.mode().ensure_writable("put")?;
        let opts = self
            .tuning
            .writes
            .single
            .write_options()
            .ok_or_else(|| Error::invalid("writes are disabled"))?;
        let cf = self.column(collection)?;
        trace!(key_len = key.len(), value_len = value.len(), "put");
        self.db.put_cf_opt(&cf, key, value, &opts).map_err(map_status)
    }
}

impl Drop for RocksDatabase {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(
                path = %self.path.display(),
                error = %err,
                "shutdown on drop failed"
            );
        }
    }
}

impl fmt::Debug for RocksDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksDatabase")
            .field("path", &self.path)
            .field("mode", &self.tuning.mode)
            .field("id", &self.id)
            .finish()
    }
}

/// Deletes the database at `path`.
///
/// The engine's own destroy runs first and its errors propagate; the
/// directory is then removed best-effort. A path that does not exist is
/// not an error.
pub fn destroy(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(());
    }
    Engine::destroy(&Options::default(), path).map_err(map_status)?;
    match std::fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not remove database directory")
        }
    }
    info!(path = %path.display(), "destroyed database");
    Ok(())
}

/// A database created at `path` after the `CURRENT` check makes the engine
/// reject `error_if_exists` with `InvalidArgument`.
fn exists_if_created_meanwhile(err: Error, path: &Path) -> Error {
    if err.kind() == ErrorKind::Invalid && path.join(CURRENT_MARKER).exists() {
        Error::exists("database already exists").with_detail(display(path))
    } else {
        err
    }
}

fn poisoned() -> Error {
    Error::failure("collection table lock poisoned")
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
