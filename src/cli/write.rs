//! `annodb write`: canonical-order textual dump of a store, or one
//! gene's subtree.

use std::io::{BufWriter, Write as _};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::query;
use crate::store::Store;
use crate::writer;

#[derive(Parser, Debug)]
pub struct Args {
    /// Path to the source `RocksDB` store.
    #[arg(long)]
    pub path_rocksdb: PathBuf,
    /// Destination file; stdout if omitted.
    #[arg(long)]
    pub out_file: Option<PathBuf>,
    /// Write only this gene's subtree, instead of the whole store.
    #[arg(long)]
    pub gene_id: Option<String>,
}

pub fn run(args: &Args) -> Result<(), anyhow::Error> {
    let store = Store::open_for_read(&args.path_rocksdb)
        .with_context(|| format!("opening store at {}", args.path_rocksdb.display()))?;

    let mut out: Box<dyn std::io::Write> = match &args.out_file {
        Some(path) => Box::new(BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    match &args.gene_id {
        Some(gene_id) => {
            let gene = query::by_id(&store, gene_id)?;
            writer::write_gene(&store, &gene, &mut out)?;
        }
        None => writer::write_all(&store, &mut out)?,
    }

    out.flush()?;
    Ok(())
}
