//! Ingestion entry point: drives an iterator of parsed lines into a
//! [`Store`](crate::store::Store), dispatching to the GFF or GTF driver
//! by elected dialect.

mod gff;
mod gtf;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::collision::{self, MergeStrategy, Outcome};
use crate::dialect::Fmt;
use crate::error::Error;
use crate::idspec::{self, IdSpec};
use crate::iterator::{FeatureIterator, IterateConfig, Transform};
use crate::store::Store;
use crate::feature::Feature;

/// The Rust realisation of `spec.md` §6's configuration surface: every
/// enumerated ingestion option.
pub struct IngestConfig {
    /// Destination store path. `force` controls whether an existing path
    /// is removed first.
    pub path_out: PathBuf,
    /// If set, delete an existing destination before opening.
    pub force: bool,
    /// Number of records sniffed for dialect election.
    pub checklines: usize,
    /// Collision policy applied to duplicate ids.
    pub merge_strategy: MergeStrategy,
    /// How ids are synthesised per record.
    pub id_spec: IdSpec,
    /// Optional per-record attribute rewriter.
    pub transform: Option<Transform>,
    /// GTF: attribute key holding a feature's owning transcript id.
    pub gtf_transcript_key: String,
    /// GTF: attribute key holding a feature's owning gene id.
    pub gtf_gene_key: String,
    /// GTF: feature type whose aggregated extent defines a transcript.
    pub gtf_subfeature: String,
    /// Skip sniffing and assume GFF3.
    pub force_gff: bool,
    /// Re-sniff every record, warning on disagreement with the elected
    /// dialect.
    pub force_dialect_check: bool,
    /// Report ingestion progress (a spinner over pass 1's record count) to
    /// the terminal as the drivers run.
    pub verbose: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            path_out: PathBuf::from(":memory:"),
            force: false,
            checklines: 10,
            merge_strategy: MergeStrategy::Error,
            id_spec: IdSpec::Keys(vec!["ID".to_string()]),
            transform: None,
            gtf_transcript_key: "transcript_id".to_string(),
            gtf_gene_key: "gene_id".to_string(),
            gtf_subfeature: "exon".to_string(),
            force_gff: false,
            force_dialect_check: false,
            verbose: false,
        }
    }
}

/// Shared mutable state threaded through both ingestion drivers: the id
/// synthesiser's per-type counters and the collision resolver's
/// per-original-id `create_unique` counters.
#[derive(Default)]
pub struct Counters {
    pub autoincrement: HashMap<String, u64>,
    pub create_unique: HashMap<String, u64>,
}

/// Outcome summary returned once ingestion completes: data useful to a
/// CLI front end for a terminal progress message.
pub struct IngestSummary {
    pub features_seen: usize,
    pub warnings: Vec<String>,
}

/// Start a pass-1 progress spinner when `verbose` is set, `None` otherwise.
/// Shared by the GFF and GTF drivers so both report progress identically.
pub(crate) fn pass1_progress(verbose: bool) -> Option<indicatif::ProgressBar> {
    verbose.then(|| {
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_style(crate::common::cli::indicatif_spinner_style());
        bar
    })
}

/// Finish a pass-1 progress spinner, reporting the *true* final record
/// count. `spec.md` §9's first open question notes that the original
/// source resets this counter to zero right before the terminal message —
/// a display bug this crate does not replicate.
pub(crate) fn finish_pass1_progress(bar: Option<indicatif::ProgressBar>, features_seen: usize) {
    if let Some(bar) = bar {
        bar.finish_with_message(format!("{features_seen} features ingested"));
    }
}

/// Flush both counter namespaces to `autoincrements` ahead of
/// finalisation. `create_unique`'s keys (original ids) and the id
/// synthesiser's keys (usually feature types) share one table, per
/// `spec.md` §3's single `autoincrements` mapping.
pub(crate) fn flush_counters(store: &Store, counters: &Counters) -> Result<(), Error> {
    store.flush_autoincrements(&counters.autoincrement)?;
    store.flush_autoincrements(&counters.create_unique)?;
    Ok(())
}

/// Synthesise an id for `feature` (mutating it in place), then insert it
/// into `store` applying the collision policy if the id already exists.
/// Returns the feature as actually stored (id and/or attributes may have
/// changed), or `None` if the collision policy dropped it (`warning`).
///
/// This is the one insertion path both the GFF and GTF pass-1 loops, and
/// the GTF pass-2 derived-record replay, funnel through — matching
/// `create.py`'s single `_insert` used from every caller.
pub fn insert_record(
    store: &Store,
    mut feature: Feature,
    id_spec: &IdSpec,
    merge_strategy: MergeStrategy,
    line_no: usize,
    counters: &mut Counters,
    warnings: &mut Vec<String>,
) -> Result<Option<Feature>, Error> {
    if feature.id.is_empty() {
        feature.id = idspec::resolve(id_spec, &feature, &mut counters.autoincrement);
    }

    match store.get_feature(&feature.id)? {
        None => {
            store.put_feature(&feature)?;
            store.put_bin_index(&feature)?;
            Ok(Some(feature))
        }
        Some(existing) => {
            match collision::resolve(merge_strategy, &existing, feature, line_no, &mut counters.create_unique)? {
                Outcome::Skip(warning) => {
                    if let Some(w) = warning {
                        tracing::warn!("{w}");
                        warnings.push(w);
                    }
                    Ok(None)
                }
                Outcome::Write(written) => {
                    store.put_feature(&written)?;
                    store.put_bin_index(&written)?;
                    Ok(Some(written))
                }
                Outcome::WriteNew(written) => {
                    store.put_feature(&written)?;
                    store.put_bin_index(&written)?;
                    Ok(Some(written))
                }
            }
        }
    }
}

/// Ingest a GFF3 or GTF file at `path_in` into a fresh store at
/// `config.path_out`, dispatching to the dialect-specialised driver after
/// the iterator elects (or is forced into) a dialect.
pub fn ingest_path<P: AsRef<Path>>(path_in: P, mut config: IngestConfig) -> Result<IngestSummary, Error> {
    prepare_destination(&config)?;
    let iterate_config = IterateConfig {
        checklines: config.checklines,
        force_dialect_check: config.force_dialect_check,
        force_gff: config.force_gff,
        dialect: None,
        transform: config.transform.take(),
    };
    let iter = FeatureIterator::from_path(path_in, iterate_config)?;
    run(iter, config)
}

/// Same as [`ingest_path`], but over literal text (`from_string`-style
/// ingestion).
pub fn ingest_string(text: &str, mut config: IngestConfig) -> Result<IngestSummary, Error> {
    prepare_destination(&config)?;
    let iterate_config = IterateConfig {
        checklines: config.checklines,
        force_dialect_check: config.force_dialect_check,
        force_gff: config.force_gff,
        dialect: None,
        transform: config.transform.take(),
    };
    let iter = FeatureIterator::from_string(text, iterate_config);
    run(iter, config)
}

fn prepare_destination(config: &IngestConfig) -> Result<(), Error> {
    if config.force && config.path_out.exists() {
        std::fs::remove_dir_all(&config.path_out).or_else(|_| std::fs::remove_file(&config.path_out))?;
    }
    Ok(())
}

fn run(mut iter: FeatureIterator, config: IngestConfig) -> Result<IngestSummary, Error> {
    let mut store = Store::open_for_write(&config.path_out)?;
    let mut counters = Counters::default();
    // A second ingestion into the same store path resumes counters from
    // where the prior run left off, per the `autoincrements` table being
    // the authoritative counter, not the in-memory map.
    let persisted = store.load_autoincrements()?;
    counters.autoincrement = persisted.clone();
    counters.create_unique = persisted;
    let mut warnings: Vec<String> = Vec::new();

    let first = match iter.next() {
        Some(Ok(feature)) => feature,
        Some(Err(e)) => return Err(e),
        None => {
            // Empty input is legal: a silent no-op over an empty sequence.
            for directive in iter.directives() {
                store.put_directive(directive)?;
            }
            store.finalize(&crate::dialect::Dialect::gff3())?;
            return Ok(IngestSummary { features_seen: 0, warnings: iter.warnings().to_vec() });
        }
    };

    let fmt = first.dialect.fmt;
    let summary = match fmt {
        Fmt::Gff3 => gff::run(store, iter, first, &config, &mut counters, &mut warnings)?,
        Fmt::Gtf => gtf::run(store, iter, first, &config, &mut counters, &mut warnings)?,
    };
    Ok(summary)
}
