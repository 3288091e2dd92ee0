//! Host resource probing.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Physical memory assumed when the host cannot be queried.
pub const FALLBACK_TOTAL_RAM: u64 = 4 * 1024 * 1024 * 1024;

/// Resources of the machine the database runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostResources {
    /// Physical memory in bytes.
    pub total_ram: u64,
    /// Hardware threads available to the process, at least 1.
    pub parallelism: usize,
}

impl HostResources {
    /// Probes the current host. Memory is queried once per process.
    pub fn detect() -> Self {
        Self {
            total_ram: total_ram(),
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    /// Fixed values, for tests and for callers that size the engine
    /// themselves.
    pub fn fixed(total_ram: u64, parallelism: usize) -> Self {
        Self {
            total_ram: if total_ram == 0 {
                FALLBACK_TOTAL_RAM
            } else {
                total_ram
            },
            parallelism: parallelism.max(1),
        }
    }
}

/// Physical memory of the host, cached after the first call.
pub fn total_ram() -> u64 {
    static TOTAL_RAM: OnceLock<u64> = OnceLock::new();
    *TOTAL_RAM.get_or_init(|| match query_total_ram() {
        Some(bytes) if bytes > 0 => bytes,
        _ => {
            tracing::debug!(
                fallback = FALLBACK_TOTAL_RAM,
                "physical memory query failed"
            );
            FALLBACK_TOTAL_RAM
        }
    })
}

#[cfg(unix)]
fn query_total_ram() -> Option<u64> {
    let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if pages <= 0 || page_size <= 0 {
        return None;
    }
    (pages as u64).checked_mul(page_size as u64)
}

#[cfg(not(unix))]
fn query_total_ram() -> Option<u64> {
    None
}
