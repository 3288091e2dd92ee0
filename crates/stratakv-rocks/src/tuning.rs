//! Per-mode engine tuning.
//!
//! [`TuningPolicy::resolve`] is a pure function of the operating mode, the
//! caller's [`TuningConfig`] and the [`HostResources`]. Its output is plain
//! data, translated into engine options only when a database is opened.
//!
//! ## Bulk load
//!
//! `BulkLoad` trades crash safety for ingest speed: an unsorted vector
//! memtable, very large write buffers, level-0 triggers pushed out of
//! reach, no automatic compaction, and no write-ahead log. Everything
//! becomes durable only when the handle is closed cleanly, which compacts
//! every collection first.

use rocksdb::{
    BlockBasedOptions, Cache, DBCompressionType, Env, MemtableFactory, Options, WriteOptions,
};
use serde::{Deserialize, Serialize};
use stratakv_core::{OperatingMode, Result};

use crate::host::HostResources;
use crate::status::map_status;

/// Level-0 trigger value that effectively disables the trigger.
pub const UNREACHABLE_TRIGGER: i32 = 1 << 30;

const DEFAULT_MEMTABLE_BUDGET: usize = 1 << 30; // 1GB
const DEFAULT_BLOCK_SIZE: usize = 64 * 1024; // 64KB

/// Compression applied to every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Store blocks uncompressed.
    None,
    /// LZ4.
    #[default]
    Lz4,
}

impl Compression {
    fn engine_type(self) -> DBCompressionType {
        match self {
            Compression::None => DBCompressionType::None,
            Compression::Lz4 => DBCompressionType::Lz4,
        }
    }
}

/// Caller-adjustable knobs feeding the tuning policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Memtable budget handed to level-style compaction optimisation.
    pub memtable_budget: usize,
    /// Number of LSM levels.
    pub num_levels: i32,
    /// Data block size of block-based tables.
    pub block_size: usize,
    /// The shared block cache is `total_ram / block_cache_divisor`.
    pub block_cache_divisor: u64,
    /// Compression for every level.
    pub compression: Compression,
    /// Upper bound on compaction threads.
    pub max_compaction_threads: usize,
    /// Upper bound on flush threads.
    pub max_flush_threads: usize,
    /// Bulk load write buffer is `total_ram / bulk_write_buffer_divisor`.
    pub bulk_write_buffer_divisor: u64,
    /// Bulk load write buffer count.
    pub bulk_max_write_buffers: i32,
    /// Bulk load buffers merged per flush.
    pub bulk_min_buffers_to_merge: i32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            memtable_budget: DEFAULT_MEMTABLE_BUDGET,
            num_levels: 5,
            block_size: DEFAULT_BLOCK_SIZE,
            block_cache_divisor: 4,
            compression: Compression::Lz4,
            max_compaction_threads: 16,
            max_flush_threads: 4,
            bulk_write_buffer_divisor: 8,
            bulk_max_write_buffers: 6,
            bulk_min_buffers_to_merge: 1,
        }
    }
}

impl TuningConfig {
    /// Sets the memtable budget.
    pub fn with_memtable_budget(mut self, bytes: usize) -> Self {
        self.memtable_budget = bytes;
        self
    }

    /// Sets the number of LSM levels.
    pub fn with_num_levels(mut self, levels: i32) -> Self {
        self.num_levels = levels;
        self
    }

    /// Sets the table block size.
    pub fn with_block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    /// Sets the block cache divisor. Zero is treated as one.
    pub fn with_block_cache_divisor(mut self, divisor: u64) -> Self {
        self.block_cache_divisor = divisor;
        self
    }

    /// Sets the compression.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Caps background compaction and flush threads.
    pub fn with_max_threads(mut self, compaction: usize, flush: usize) -> Self {
        self.max_compaction_threads = compaction;
        self.max_flush_threads = flush;
        self
    }

    /// Sets the bulk load write buffer divisor. Zero is treated as one.
    pub fn with_bulk_write_buffer_divisor(mut self, divisor: u64) -> Self {
        self.bulk_write_buffer_divisor = divisor;
        self
    }
}

/// Memtable representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemtableKind {
    /// Sorted skip list; supports concurrent inserts.
    SkipList,
    /// Unsorted append-only vector, sorted on flush.
    Vector,
}

/// Write buffer overrides used by bulk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteBufferTuning {
    /// Bytes per write buffer.
    pub size: usize,
    /// Buffers kept in memory.
    pub max_number: i32,
    /// Buffers merged per flush.
    pub min_to_merge: i32,
}

/// Settings applied to each collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionTuning {
    /// Budget for level-style compaction optimisation.
    pub memtable_budget: usize,
    /// Number of LSM levels.
    pub num_levels: i32,
    /// Data block size.
    pub block_size: usize,
    /// Capacity of the block cache shared by every collection.
    pub block_cache_bytes: usize,
    /// Compression for every level.
    pub compression: Compression,
    /// Memtable representation.
    pub memtable: MemtableKind,
    /// Write buffer overrides, bulk load only.
    pub write_buffer: Option<WriteBufferTuning>,
    /// Level-0 compaction, slowdown and stop triggers, when overridden.
    pub level0_triggers: Option<i32>,
    /// Turns off background compaction; only an explicit compaction runs.
    pub disable_auto_compactions: bool,
}

/// Settings applied once per database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseTuning {
    /// Open file limit; `-1` keeps every table file open.
    pub max_open_files: i32,
    /// Low-priority background threads.
    pub compaction_threads: i32,
    /// High-priority background threads.
    pub flush_threads: i32,
    /// Drop the engine's own periodic and forced syncs.
    pub disable_data_sync: bool,
    /// Allow concurrent memtable inserts. The vector memtable needs this off.
    pub concurrent_memtable_writes: bool,
}

/// Durability of one kind of write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WriteDurability {
    /// The mode forbids writes.
    Rejected,
    /// Written to the WAL, optionally synced before returning.
    Logged {
        /// Sync the WAL before acknowledging.
        sync: bool,
    },
    /// WAL bypassed; lost on crash until flushed.
    Unlogged,
}

impl WriteDurability {
    /// Engine write options, or `None` when writes are rejected.
    pub fn write_options(self) -> Option<WriteOptions> {
        let mut opts = WriteOptions::default();
        match self {
            WriteDurability::Rejected => return None,
            WriteDurability::Logged { sync } => {
                opts.disable_wal(false);
                opts.set_sync(sync);
            }
            WriteDurability::Unlogged => {
                opts.disable_wal(true);
                opts.set_sync(false);
            }
        }
        Some(opts)
    }
}

/// Durability of single puts and of batch commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WritePolicy {
    /// Single `put` calls.
    pub single: WriteDurability,
    /// Batch commits.
    pub batch: WriteDurability,
}

/// Everything the policy decides for one mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tuning {
    /// Mode this tuning was resolved for.
    pub mode: OperatingMode,
    /// Database-wide settings.
    pub database: DatabaseTuning,
    /// Settings for every collection, including ones created later.
    pub collection: CollectionTuning,
    /// Write durability.
    pub writes: WritePolicy,
}

/// Resolves a [`Tuning`] per operating mode.
#[derive(Debug, Clone)]
pub struct TuningPolicy {
    config: TuningConfig,
    host: HostResources,
}

impl TuningPolicy {
    /// Creates a policy from explicit inputs.
    pub fn new(config: TuningConfig, host: HostResources) -> Self {
        Self { config, host }
    }

    /// Default knobs on the detected host.
    pub fn detect() -> Self {
        Self::new(TuningConfig::default(), HostResources::detect())
    }

    /// The knobs this policy was built from.
    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    /// The host this policy sizes for.
    pub fn host(&self) -> HostResources {
        self.host
    }

    /// Computes the tuning for `mode`.
    pub fn resolve(&self, mode: OperatingMode) -> Tuning {
        let cfg = &self.config;
        let ram = self.host.total_ram;
        let bulk = mode == OperatingMode::BulkLoad;

        let collection = CollectionTuning {
            memtable_budget: cfg.memtable_budget,
            num_levels: cfg.num_levels,
            block_size: cfg.block_size,
            block_cache_bytes: clamp_usize(ram / cfg.block_cache_divisor.max(1)),
            compression: cfg.compression,
            memtable: if bulk {
                MemtableKind::Vector
            } else {
                MemtableKind::SkipList
            },
            write_buffer: bulk.then(|| WriteBufferTuning {
                size: clamp_usize(ram / cfg.bulk_write_buffer_divisor.max(1)),
                max_number: cfg.bulk_max_write_buffers,
                min_to_merge: cfg.bulk_min_buffers_to_merge,
            }),
            level0_triggers: bulk.then_some(UNREACHABLE_TRIGGER),
            disable_auto_compactions: bulk,
        };

        let database = DatabaseTuning {
            max_open_files: -1,
            compaction_threads: thread_count(self.host.parallelism, cfg.max_compaction_threads),
            flush_threads: thread_count(self.host.parallelism, cfg.max_flush_threads),
            disable_data_sync: bulk,
            concurrent_memtable_writes: !bulk,
        };

        let writes = match mode {
            OperatingMode::Normal => WritePolicy {
                single: WriteDurability::Logged { sync: false },
                batch: WriteDurability::Logged { sync: true },
            },
            OperatingMode::BulkLoad => WritePolicy {
                single: WriteDurability::Unlogged,
                batch: WriteDurability::Unlogged,
            },
            OperatingMode::ReadOnly => WritePolicy {
                single: WriteDurability::Rejected,
                batch: WriteDurability::Rejected,
            },
        };

        Tuning {
            mode,
            database,
            collection,
            writes,
        }
    }
}

fn thread_count(parallelism: usize, cap: usize) -> i32 {
    let n = parallelism.min(cap).max(1);
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn clamp_usize(bytes: u64) -> usize {
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

impl CollectionTuning {
    /// Writes these settings into `opts`, sharing `cache` across
    /// collections.
    pub fn apply(&self, opts: &mut Options, cache: &Cache) {
        // Must run before the compression and write buffer overrides.
        opts.optimize_level_style_compaction(self.memtable_budget);
        opts.set_num_levels(self.num_levels);
        opts.set_compression_per_level(&[]);
        opts.set_compression_type(self.compression.engine_type());

        let mut table = BlockBasedOptions::default();
        table.set_block_size(self.block_size);
        table.set_block_cache(cache);
        opts.set_block_based_table_factory(&table);

        // Skip list is the engine default.
        if self.memtable == MemtableKind::Vector {
            opts.set_memtable_factory(MemtableFactory::Vector);
        }

        if let Some(wb) = self.write_buffer {
            opts.set_write_buffer_size(wb.size);
            opts.set_max_write_buffer_number(wb.max_number);
            opts.set_min_write_buffer_number_to_merge(wb.min_to_merge);
        }

        if let Some(trigger) = self.level0_triggers {
            opts.set_level_zero_file_num_compaction_trigger(trigger);
            opts.set_level_zero_slowdown_writes_trigger(trigger);
            opts.set_level_zero_stop_writes_trigger(trigger);
        }

        opts.set_disable_auto_compactions(self.disable_auto_compactions);
    }

    /// A fresh option set holding only these collection settings.
    pub fn to_options(&self, cache: &Cache) -> Options {
        let mut opts = Options::default();
        self.apply(&mut opts, cache);
        opts
    }
}

impl DatabaseTuning {
    /// Writes these settings into `opts`, resizing the engine's thread
    /// pools.
    pub fn apply(&self, opts: &mut Options) -> Result<()> {
        opts.set_max_open_files(self.max_open_files);
        opts.set_max_background_jobs(self.compaction_threads + self.flush_threads);

        let mut env = Env::new().map_err(map_status)?;
        env.set_background_threads(self.compaction_threads);
        env.set_high_priority_background_threads(self.flush_threads);
        opts.set_env(&env);

        opts.set_allow_concurrent_memtable_write(self.concurrent_memtable_writes);
        if self.disable_data_sync {
            // No per-write data sync knob exists any more; this removes
            // every periodic or forced sync the engine would issue itself.
            opts.set_use_fsync(false);
            opts.set_bytes_per_sync(0);
            opts.set_wal_bytes_per_sync(0);
        }
        Ok(())
    }
}

impl Tuning {
    /// Database options: collection settings as the defaults, then the
    /// database-wide settings.
    pub fn db_options(&self, cache: &Cache) -> Result<Options> {
        let mut opts = self.collection.to_options(cache);
        self.database.apply(&mut opts)?;
        Ok(opts)
    }
}
