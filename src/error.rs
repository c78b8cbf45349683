//! Error type definition.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for `annodb`.
#[derive(Error, Debug)]
pub enum Error {
    /// Error in underlying I/O.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    /// A data line had fewer than nine tab-separated fields and was not
    /// uniformly blank, so it could not be parsed even as a placeholder.
    #[error("malformed line {0}: expected at least 9 columns, got {1}")]
    MalformedLine(usize, usize),
    /// Raised under `MergeStrategy::Error` when an id is already present.
    #[error("duplicate id '{id}' on line {line}")]
    DuplicateId {
        /// The offending id.
        id: String,
        /// 1-based source line number.
        line: usize,
    },
    /// Raised under `MergeStrategy::Merge` when a non-attribute field of
    /// colliding records disagrees.
    #[error("merge conflict for id '{id}' on line {line}: field '{field}' differs")]
    MergeConflict {
        /// Name of the field that disagreed.
        field: &'static str,
        /// The id shared by both records.
        id: String,
        /// 1-based source line number of the incoming record.
        line: usize,
    },
    /// An id lookup against the store found nothing.
    #[error("no feature with id '{0}'")]
    NotFound(String),
    /// Problem opening RocksDB.
    #[error("problem opening RocksDB at {0}: {1}")]
    RocksDbOpen(PathBuf, #[source] rocksdb::Error),
    /// Problem performing a RocksDB operation.
    #[error("RocksDB error: {0}")]
    RocksDb(#[source] rocksdb::Error),
    /// Problem with RocksDB property query.
    #[error("problem accessing RocksDB property: {0}")]
    RocksDbProperty(#[source] rocksdb::Error),
    /// Problem (de)serialising a JSON store column.
    #[error("JSON (de)serialisation error: {0}")]
    Json(#[source] serde_json::Error),
    /// The store has not been finalised (no `meta` row) and is not valid to
    /// open for reading.
    #[error("store at {0} was never finalised (missing meta row)")]
    NotFinalized(PathBuf),
    /// An invalid `merge_strategy` string was supplied.
    #[error("invalid merge strategy '{0}'")]
    InvalidMergeStrategy(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::RocksDb(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
