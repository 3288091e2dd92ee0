//! Translation of RocksDB status codes into the stratakv error taxonomy.

use rocksdb::ErrorKind as RocksKind;
use stratakv_core::Error;

/// Maps an engine error onto exactly one [`stratakv_core::ErrorKind`].
///
/// Use as `.map_err(map_status)` at every engine call site.
pub fn map_status(err: rocksdb::Error) -> Error {
    map_kind(err.kind(), err.into_string())
}

pub(crate) fn map_kind(kind: RocksKind, diagnostic: String) -> Error {
    match kind {
        RocksKind::NotFound => Error::not_found("RocksDB NotFound").with_detail(diagnostic),
        RocksKind::Corruption => Error::failure("corruption").with_detail(diagnostic),
        RocksKind::NotSupported => {
            Error::not_implemented("RocksDB NotSupported").with_detail(diagnostic)
        }
        RocksKind::InvalidArgument => {
            Error::invalid("RocksDB InvalidArgument").with_detail(diagnostic)
        }
        RocksKind::IOError => Error::io("RocksDB IOError").with_detail(diagnostic),
        RocksKind::MergeInProgress => Error::failure("merge in progress"),
        RocksKind::Incomplete => Error::failure("incomplete"),
        RocksKind::ShutdownInProgress => Error::failure("shutdown in progress"),
        RocksKind::TimedOut => Error::failure("timed out"),
        RocksKind::Aborted => Error::failure("aborted"),
        _ => Error::failure("other reason").with_detail(diagnostic),
    }
}
