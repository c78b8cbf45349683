//! `annodb db-utils`: maintenance sub-commands over a store file.

use clap::{Parser, Subcommand};

use crate::common;

#[derive(Parser, Debug)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dump the `meta` column family.
    DumpMeta(DumpMetaArgs),
    /// Force `RocksDB` compaction of every column family.
    Compact(CompactArgs),
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Dump the metadata column family", long_about = None)]
pub struct DumpMetaArgs {
    /// Path to the store.
    #[arg(long)]
    pub path_in: String,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Force compaction of all column families", long_about = None)]
pub struct CompactArgs {
    /// Path to the store.
    #[arg(long)]
    pub path_in: String,
}

pub fn run(common: &common::cli::Args, args: &Args) -> Result<(), anyhow::Error> {
    match &args.command {
        Command::DumpMeta(sub) => dump_meta(common, sub),
        Command::Compact(sub) => compact(common, sub),
    }
}

/// Dump every `(key, value)` pair in the `meta` column family: a raw
/// iterator over the CF, a `#key\tvalue` header, and a trailing
/// `#rows` count.
fn dump_meta(common: &common::cli::Args, args: &DumpMetaArgs) -> Result<(), anyhow::Error> {
    tracing::info!("Starting 'db-utils dump-meta' command");
    tracing::info!("common = {:#?}", common);
    tracing::info!("args = {:#?}", args);

    let cf_names = rocksdb::DB::list_cf(&rocksdb::Options::default(), &args.path_in)?;
    if !cf_names.iter().any(|s| s == crate::store::CF_META) {
        anyhow::bail!("input store does not contain a column family named '{}'", crate::store::CF_META);
    }
    let db_read = rocksdb::DB::open_cf_for_read_only(
        &rocksdb::Options::default(),
        common::cli::readlink_f(&args.path_in)?,
        [crate::store::CF_META],
        false,
    )?;

    println!("#key\tvalue");
    let mut count = 0;
    let cf_read = db_read.cf_handle(crate::store::CF_META).unwrap();
    let mut iter = db_read.raw_iterator_cf(&cf_read);
    iter.seek(b"");
    while iter.valid() {
        if let Some(iter_value) = iter.value() {
            let iter_key = iter.key().unwrap();
            println!("{}\t{}", String::from_utf8_lossy(iter_key), String::from_utf8_lossy(iter_value));
            iter.next();
            count += 1;
        } else {
            break;
        }
    }
    println!("#rows\t{count}");

    Ok(())
}

/// Force compaction of every column family, via
/// [`common::rocks_utils::force_compaction`].
fn compact(common: &common::cli::Args, args: &CompactArgs) -> Result<(), anyhow::Error> {
    tracing::info!("Starting 'db-utils compact' command");
    tracing::info!("common = {:#?}", common);
    tracing::info!("args = {:#?}", args);

    let options = rocksdb::Options::default();
    crate::common::rocks_utils::force_compaction(&args.path_in, &options, Some("compacting store: "))?;
    Ok(())
}
