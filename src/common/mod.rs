//! Common and utility code shared across the ingestion, store, and CLI
//! layers.

pub mod bins;
pub mod cli;
pub mod rocks_utils;

/// The version of the `annodb` package, written into `meta.version` at
/// finalisation.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
