//! The GFF3 ingestion driver: `Parent`-attribute edges in pass 1, a
//! grandchild closure in pass 2.

use std::io::{BufWriter, Write};

use tempfile::NamedTempFile;

use super::{insert_record, Counters, IngestConfig, IngestSummary};
use crate::error::Error;
use crate::feature::Feature;
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

    close_grandchildren(&store)?;

    super::flush_counters(&store, counters)?;
    store.finalize(&crate::dialect::Dialect::gff3())?;
    Ok(IngestSummary { features_seen, warnings: warnings.clone() })
}

/// Resolve and insert one record, then emit its level-1 `Parent` edges.
fn ingest_one(
    store: &Store,
    feature: Feature,
    record_no: usize,
    config: &IngestConfig,
    counters: &mut Counters,
    warnings: &mut Vec<String>,
) -> Result<(), Error> {
    let parents: Vec<String> = feature.attributes.get("Parent").map(<[String]>::to_vec).unwrap_or_default();

    if let Some(stored) = insert_record(store, feature, &config.id_spec, config.merge_strategy, record_no, counters, warnings)? {
        for parent in parents {
            store.put_relation(&parent, &stored.id, Level::Direct)?;
        }
    }
    Ok(())
}

/// Pass 2: for each parent `p` with level-1 children `C`, and each `c` in
/// `C` with its own level-1 children `G`, emit `(p, g, 2)` for every `g`
/// in `G`. Results are staged through an anonymous scratch file before
/// bulk insertion, so the closure computation (reading `relations`) never
/// shares a transaction with the bulk insert writing to it.
fn close_grandchildren(store: &Store) -> Result<(), Error> {
    let mut scratch = NamedTempFile::new()?;
    {
        let mut writer = BufWriter::new(scratch.as_file_mut());

        for id in store.all_ids()? {
            for child in store.children(&id, Level::Direct)? {
                for grandchild in store.children(&child, Level::Direct)? {
                    writeln!(writer, "{id}\t{grandchild}")?;
                }
            }
        }
        writer.flush()?;
    }

    let contents = std::fs::read_to_string(scratch.path())?;
    for line in contents.lines() {
        if let Some((parent, grandchild)) = line.split_once('\t') {
            store.put_relation(parent, grandchild, Level::Transitive)?;
        }
    }
    scratch.close()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ingest::{ingest_string, IngestConfig};

    #[test]
    fn gff3_parent_chain_produces_expected_edges() -> Result<(), Error> {
        let text = "\
chr1\t.\tgene\t1\t1000\t.\t+\t.\tID=gene1
chr1\t.\tmRNA\t1\t1000\t.\t+\t.\tID=mRNA1;Parent=gene1
chr1\t.\texon\t1\t500\t.\t+\t.\tID=exon1;Parent=mRNA1
";
        let temp = tempfile::TempDir::new()?;
        let config = IngestConfig { path_out: temp.path().join("db"), ..Default::default() };
        let summary = ingest_string(text, config)?;
        assert_eq!(summary.features_seen, 3);

        let store = Store::open_for_read(temp.path().join("db"))?;
        assert_eq!(store.children("gene1", Level::Direct)?, vec!["mRNA1".to_string()]);
        assert_eq!(store.children("mRNA1", Level::Direct)?, vec!["exon1".to_string()]);
        assert_eq!(store.children("gene1", Level::Transitive)?, vec!["exon1".to_string()]);
        Ok(())
    }
}
