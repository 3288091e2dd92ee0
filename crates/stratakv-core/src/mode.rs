//! Operating modes and the shutdown plan each one implies.
//!
//! The mode is chosen when a database is opened and never changes for the
//! lifetime of the handle. It decides durability settings, the memtable
//! strategy, and what has to happen when the handle is released.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a database handle was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Crash-safe reads and writes. Batches commit with WAL and sync.
    #[default]
    Normal,
    /// Write-only ingestion with the WAL and auto compaction turned off.
    ///
    /// Data is not crash-safe until the handle is closed cleanly, and
    /// closing runs a full compaction that can take a long time.
    BulkLoad,
    /// No mutation of any kind; close skips compaction and flush.
    ReadOnly,
}

impl OperatingMode {
    /// All modes, in declaration order.
    pub const ALL: [OperatingMode; 3] = [
        OperatingMode::Normal,
        OperatingMode::BulkLoad,
        OperatingMode::ReadOnly,
    ];

    /// Returns true for [`OperatingMode::ReadOnly`].
    pub fn is_read_only(self) -> bool {
        self == OperatingMode::ReadOnly
    }

    /// Fails with [`ErrorKind::Invalid`](crate::ErrorKind::Invalid) when
    /// `operation` would mutate a read-only database.
    pub fn ensure_writable(self, operation: &str) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::invalid(format!(
                "{} is not permitted on a read-only database",
                operation
            )));
        }
        Ok(())
    }

    /// The ordered steps run when a handle in this mode is released.
    ///
    /// Releasing collection handles and then the engine handle always
    /// follows these steps and is not listed.
    pub fn shutdown_plan(self) -> &'static [ShutdownStep] {
        match self {
            OperatingMode::Normal => &[ShutdownStep::SyncWal, ShutdownStep::FlushAll],
            OperatingMode::BulkLoad => &[
                ShutdownStep::CompactAll,
                ShutdownStep::SyncWal,
                ShutdownStep::FlushAll,
            ],
            OperatingMode::ReadOnly => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            OperatingMode::Normal => "normal",
            OperatingMode::BulkLoad => "bulk_load",
            OperatingMode::ReadOnly => "read_only",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" => Ok(OperatingMode::Normal),
            "bulk_load" | "bulkload" => Ok(OperatingMode::BulkLoad),
            "read_only" | "readonly" => Ok(OperatingMode::ReadOnly),
            other => Err(Error::invalid(format!("unknown operating mode: {}", other))),
        }
    }
}

/// One step of the mode-dependent shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownStep {
    /// Compact the full key range of every collection. Unbounded duration.
    CompactAll,
    /// Force the write-ahead log to stable storage.
    SyncWal,
    /// Flush every collection's memtables to disk.
    FlushAll,
}

impl fmt::Display for ShutdownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownStep::CompactAll => "compact-all",
            ShutdownStep::SyncWal => "sync-wal",
            ShutdownStep::FlushAll => "flush-all",
        };
        f.write_str(name)
    }
}
