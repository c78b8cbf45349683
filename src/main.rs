use annodb::{cli, common};
use clap::{command, Parser, Subcommand};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "GFF3/GTF ingestion into a RocksDB-backed annotation store",
    long_about = "Ingests GFF3 or GTF genome annotation files, normalises them \
    into a uniform feature model, and materialises them into a queryable \
    RocksDB store."
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::cli::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// "ingest" sub command
    Ingest(cli::ingest::Args),
    /// "query" sub command
    Query(cli::query::Args),
    /// "write" sub command
    Write(cli::write::Args),
    /// "db-utils" sub commands
    DbUtils(cli::db_utils::Args),
}

pub fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Ingest(args) => cli::ingest::run(&cli.common, args)?,
            Commands::Query(args) => cli::query::run(args)?,
            Commands::Write(args) => cli::write::run(args)?,
            Commands::DbUtils(args) => cli::db_utils::run(&cli.common, args)?,
        }
        Ok(())
    })
}
