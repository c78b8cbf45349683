//! `annodb ingest`: GFF3/GTF import into a fresh `RocksDB` store.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;

use crate::collision::MergeStrategy;
use crate::idspec::IdSpec;
use crate::ingest::{self, IngestConfig};

/// Ingest a GFF3 or GTF annotation file into a `RocksDB` store.
#[derive(Parser, Debug)]
pub struct Args {
    /// Path to the input GFF3/GTF file.
    #[arg(long)]
    pub path_in: PathBuf,
    /// Path to the destination `RocksDB` store.
    #[arg(long)]
    pub path_out_rocksdb: PathBuf,
    /// Attribute keys (or `:field:` sentinels) tried in order for id
    /// synthesis; falls back to per-type auto-increment when none yield
    /// a value.
    #[arg(long, value_delimiter = ',', default_value = "ID")]
    pub id_spec_keys: Vec<String>,
    /// Remove an existing destination before opening.
    #[arg(long)]
    pub force: bool,
    /// Number of records sniffed for dialect election.
    #[arg(long, default_value_t = 10)]
    pub checklines: usize,
    /// Collision policy: `error | warning | merge | replace | create_unique`.
    #[arg(long, default_value = "error")]
    pub merge_strategy: String,
    /// GTF attribute key holding a feature's owning transcript id.
    #[arg(long, default_value = "transcript_id")]
    pub gtf_transcript_key: String,
    /// GTF attribute key holding a feature's owning gene id.
    #[arg(long, default_value = "gene_id")]
    pub gtf_gene_key: String,
    /// GTF feature type whose aggregated extent defines a transcript.
    #[arg(long, default_value = "exon")]
    pub gtf_subfeature: String,
    /// Skip sniffing and assume GFF3.
    #[arg(long)]
    pub force_gff: bool,
    /// Re-sniff every record, warning on disagreement with the elected
    /// dialect.
    #[arg(long)]
    pub force_dialect_check: bool,
    /// Report ingestion progress to the terminal as records are consumed.
    #[arg(long)]
    pub verbose: bool,
}

pub fn run(common: &crate::common::cli::Args, args: &Args) -> Result<(), anyhow::Error> {
    let _ = common;
    let merge_strategy = MergeStrategy::from_str(&args.merge_strategy)
        .with_context(|| format!("invalid --merge-strategy {:?}", args.merge_strategy))?;

    let config = IngestConfig {
        path_out: args.path_out_rocksdb.clone(),
        force: args.force,
        checklines: args.checklines,
        merge_strategy,
        id_spec: IdSpec::Keys(args.id_spec_keys.clone()),
        transform: None,
        gtf_transcript_key: args.gtf_transcript_key.clone(),
        gtf_gene_key: args.gtf_gene_key.clone(),
        gtf_subfeature: args.gtf_subfeature.clone(),
        force_gff: args.force_gff,
        force_dialect_check: args.force_dialect_check,
        verbose: args.verbose,
    };

    tracing::info!("ingesting {} into {}", args.path_in.display(), args.path_out_rocksdb.display());
    let summary = ingest::ingest_path(&args.path_in, config).context("ingestion failed")?;
    tracing::info!("ingested {} features, {} warnings", summary.features_seen, summary.warnings.len());
    for warning in &summary.warnings {
        tracing::warn!("{warning}");
    }

    Ok(())
}
