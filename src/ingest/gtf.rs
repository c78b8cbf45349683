//! The GTF ingestion driver: pass 1 derives edges from `transcript_id`/
//! `gene_id` attributes; pass 2 synthesises the transcript and gene
//! records GTF never states explicitly.

use std::io::{BufRead, BufWriter, Write};

use itertools::Itertools;
use rustc_hash::FxHashMap;
use tempfile::NamedTempFile;

use super::{insert_record, Counters, IngestConfig, IngestSummary};
use crate::attrs::Attributes;
use crate::collision::MergeStrategy;
use crate::dialect::Dialect;
use crate::error::Error;
use crate::feature::{Feature, Frame, Strand};
use crate::iterator::FeatureIterator;
use crate::store::keys::Level;
use crate::store::Store;

pub fn run(
    mut store: Store,
    mut iter: FeatureIterator,
    first: Feature,
    config: &IngestConfig,
    counters: &mut Counters,
    warnings: &mut Vec<String>,
) -> Result<IngestSummary, Error> {
    let mut features_seen = 0usize;
    let mut record_no = 0usize;
    let progress = super::pass1_progress(config.verbose);

    ingest_one(&store, first, record_no, config, counters, warnings)?;
    features_seen += 1;
    record_no += 1;
    if let Some(bar) = &progress {
        bar.inc(1);
    }

    while let Some(result) = iter.next() {
        let feature = result?;
        ingest_one(&store, feature, record_no, config, counters, warnings)?;
        features_seen += 1;
        record_no += 1;
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }
    super::finish_pass1_progress(progress, features_seen);

    for directive in iter.directives() {
        store.put_directive(directive)?;
    }
    warnings.extend(iter.warnings().iter().cloned());

    derive_transcripts_and_genes(&store, config, counters, warnings)?;

    super::flush_counters(&store, counters)?;
    store.finalize(&Dialect::gtf())?;
    Ok(IngestSummary { features_seen, warnings: warnings.clone() })
}

/// Resolve and insert one record, then emit its level-1/level-2 edges
/// from the `transcript_key`/`gene_key` attributes (GTF has no `Parent`
/// column; ancestry is implicit in these two attributes).
fn ingest_one(
    store: &Store,
    feature: Feature,
    record_no: usize,
    config: &IngestConfig,
    counters: &mut Counters,
    warnings: &mut Vec<String>,
) -> Result<(), Error> {
    let transcript = feature.attributes.get_first(&config.gtf_transcript_key).map(str::to_string);
    let gene = feature.attributes.get_first(&config.gtf_gene_key).map(str::to_string);

    if let Some(stored) = insert_record(store, feature, &config.id_spec, config.merge_strategy, record_no, counters, warnings)? {
        if let Some(t) = &transcript {
            store.put_relation(t, &stored.id, Level::Direct)?;
        }
        if let Some(g) = &gene {
            store.put_relation(g, &stored.id, Level::Transitive)?;
            if let Some(t) = &transcript {
                store.put_relation(g, t, Level::Direct)?;
            }
        }
    }
    Ok(())
}

/// Aggregate extent of a set of `subfeature` children: min(start),
/// max(end), and a first-seen-wins `strand`/`seqid`, warning on
/// disagreement.
struct Extent {
    seqid: String,
    start: i64,
    end: i64,
    strand: Strand,
}

fn aggregate_extent(children: &[Feature], warnings: &mut Vec<String>, owner: &str) -> Option<Extent> {
    let mut iter = children.iter();
    let first = iter.next()?;
    let mut extent = Extent {
        seqid: first.seqid.clone(),
        start: first.start.unwrap_or(first.end.unwrap_or(0)),
        end: first.end.unwrap_or(first.start.unwrap_or(0)),
        strand: first.strand,
    };
    for child in iter {
        if let Some(start) = child.start {
            extent.start = extent.start.min(start);
        }
        if let Some(end) = child.end {
            extent.end = extent.end.max(end);
        }
        if child.seqid != extent.seqid {
            let msg = format!("inconsistent seqid among {owner}'s sub-features: first-seen '{}' wins over '{}'", extent.seqid, child.seqid);
            warnings.push(msg.clone());
            tracing::warn!("{msg}");
        }
        if child.strand != extent.strand {
            let msg = format!("inconsistent strand among {owner}'s sub-features: first-seen '{}' wins over '{}'", extent.strand, child.strand);
            warnings.push(msg.clone());
            tracing::warn!("{msg}");
        }
    }
    Some(extent)
}

fn synthesize(id: &str, featuretype: &str, extent: &Extent, attrs: Attributes) -> Feature {
    let mut feature = Feature {
        id: id.to_string(),
        seqid: extent.seqid.clone(),
        source: "gffutils_derived".to_string(),
        featuretype: featuretype.to_string(),
        start: Some(extent.start),
        end: Some(extent.end),
        score: ".".to_string(),
        strand: extent.strand,
        frame: Frame::Unset,
        attributes: attrs,
        extra: Vec::new(),
        bin: 0,
        dialect: Dialect::gtf(),
    };
    feature.recompute_bin();
    feature
}

/// Pass 2: derive transcript records (aggregating `subfeature` children)
/// and gene records (aggregating across a gene's transcripts' children),
/// replaying them through [`insert_record`] pinned to `merge` so a
/// transcript or gene already present in the input is attribute-unioned,
/// not overwritten.
fn derive_transcripts_and_genes(
    store: &Store,
    config: &IngestConfig,
    counters: &mut Counters,
    warnings: &mut Vec<String>,
) -> Result<(), Error> {
    // Step 1: transcripts are level-1 parents with at least one
    // `subfeature`-typed child.
    let mut transcript_children: FxHashMap<String, Vec<Feature>> = FxHashMap::default();
    for id in store.all_ids()? {
        let mut subfeatures = Vec::new();
        for child_id in store.children(&id, Level::Direct)? {
            if let Some(child) = store.get_feature(&child_id)? {
                if child.featuretype == config.gtf_subfeature {
                    subfeatures.push(child);
                }
            }
        }
        if !subfeatures.is_empty() {
            transcript_children.insert(id, subfeatures);
        }
    }

    // Step 2: join transcripts back to their gene. Sorted by gene id so
    // the `chunk_by` below sees contiguous runs per gene (mirrors the
    // original's `ORDER BY gene_id`).
    let mut gene_transcript_pairs: Vec<(String, String)> = transcript_children
        .keys()
        .map(|transcript_id| {
            let gene_id = store.parents(transcript_id, Level::Direct)?.into_iter().next();
            Ok((gene_id, transcript_id.clone()))
        })
        .collect::<Result<Vec<_>, Error>>()?
        .into_iter()
        .filter_map(|(gene_id, transcript_id)| gene_id.map(|g| (g, transcript_id)))
        .collect();
    gene_transcript_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut scratch = NamedTempFile::new()?;
    {
        let mut writer = BufWriter::new(scratch.as_file_mut());
        for (gene_id, group) in &gene_transcript_pairs.into_iter().chunk_by(|(gene_id, _)| gene_id.clone()) {
            let transcript_ids: Vec<String> = group.map(|(_, transcript_id)| transcript_id).collect();
            let mut gene_children: Vec<Feature> = Vec::new();
            for transcript_id in &transcript_ids {
                let children = &transcript_children[transcript_id];
                if let Some(extent) = aggregate_extent(children, warnings, transcript_id) {
                    let mut attrs = Attributes::new();
                    attrs.push(config.gtf_transcript_key.clone(), transcript_id.clone());
                    attrs.push(config.gtf_gene_key.clone(), gene_id.clone());
                    let transcript = synthesize(transcript_id, "transcript", &extent, attrs);
                    writeln!(writer, "{}", serde_json::to_string(&transcript)?)?;
                }
                gene_children.extend(children.iter().cloned());
            }
            if let Some(extent) = aggregate_extent(&gene_children, warnings, &gene_id) {
                let mut attrs = Attributes::new();
                attrs.push(config.gtf_gene_key.clone(), gene_id.clone());
                let gene = synthesize(&gene_id, "gene", &extent, attrs);
                writeln!(writer, "{}", serde_json::to_string(&gene)?)?;
            }
        }
        writer.flush()?;
    }

    let reader = std::io::BufReader::new(scratch.reopen()?);
    let mut record_no = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let derived: Feature = serde_json::from_str(&line)?;
        insert_record(store, derived, &config.id_spec, MergeStrategy::Merge, record_no, counters, warnings)?;
        record_no += 1;
    }
    scratch.close()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ingest::{ingest_string, IngestConfig};

    #[test]
    fn gtf_gene_inference_aggregates_exon_extents() -> Result<(), Error> {
        let text = "\
chr1\tsrc\texon\t100\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t200\t250\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t300\t350\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
";
        let temp = tempfile::TempDir::new()?;
        let config = IngestConfig { path_out: temp.path().join("db"), ..Default::default() };
        ingest_string(text, config)?;

        let store = Store::open_for_read(temp.path().join("db"))?;
        let transcript = store.get_feature("T1")?.expect("derived transcript");
        assert_eq!(transcript.start, Some(100));
        assert_eq!(transcript.end, Some(350));
        assert_eq!(transcript.featuretype, "transcript");

        let gene = store.get_feature("G1")?.expect("derived gene");
        assert_eq!(gene.start, Some(100));
        assert_eq!(gene.end, Some(350));
        assert_eq!(gene.featuretype, "gene");

        assert_eq!(store.children("G1", Level::Direct)?, vec!["T1".to_string()]);
        assert_eq!(store.parents("T1", Level::Direct)?, vec!["G1".to_string()]);
        Ok(())
    }
}
