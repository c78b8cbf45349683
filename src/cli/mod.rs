//! Command-line subcommand modules: one module per subcommand group.

pub mod db_utils;
pub mod ingest;
pub mod query;
pub mod write;
