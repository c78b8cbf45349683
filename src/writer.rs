//! Canonical-order textual writer: genes, then their `mRNA` children
//! ordered by total exon length descending, then each `mRNA`'s `exon`
//! children ordered by start ascending, mirroring `gffwriter.py`'s
//! `write_gene_recs`/`write_mRNA_children`/`write_exon_children`.

use std::io::Write;

use crate::error::Error;
use crate::feature::Feature;
use crate::query;
use crate::store::keys::Level;
use crate::store::Store;

const TRANSCRIPT_TYPES: &[&str] = &["mRNA", "transcript"];

fn total_exon_length(store: &Store, transcript_id: &str) -> Result<i64, Error> {
    let mut total = 0i64;
    for child in query::children(store, transcript_id, Level::Direct)? {
        if child.featuretype == "exon" {
            if let (Some(start), Some(end)) = (child.start, child.end) {
                total += end - start + 1;
            }
        }
    }
    Ok(total)
}

/// Write one gene and its full subtree in canonical order.
pub fn write_gene<W: Write>(store: &Store, gene: &Feature, out: &mut W) -> Result<(), Error> {
    writeln!(out, "{}", gene.to_line())?;

    let children = query::children(store, &gene.id, Level::Direct)?;
    let (mut transcripts, others): (Vec<Feature>, Vec<Feature>) =
        children.into_iter().partition(|c| TRANSCRIPT_TYPES.contains(&c.featuretype.as_str()));

    // Longest total exon length first: the original's heuristic for
    // picking a representative/primary transcript to read first.
    let mut lengths: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
    for transcript in &transcripts {
        lengths.insert(transcript.id.clone(), total_exon_length(store, &transcript.id)?);
    }
    transcripts.sort_by_key(|t| std::cmp::Reverse(*lengths.get(&t.id).unwrap_or(&0)));

    for transcript in &transcripts {
        write_transcript_children(store, transcript, out)?;
    }
    for other in &others {
        writeln!(out, "{}", other.to_line())?;
    }
    Ok(())
}

fn write_transcript_children<W: Write>(store: &Store, transcript: &Feature, out: &mut W) -> Result<(), Error> {
    writeln!(out, "{}", transcript.to_line())?;

    let children = query::children(store, &transcript.id, Level::Direct)?;
    let (mut exons, non_exons): (Vec<Feature>, Vec<Feature>) =
        children.into_iter().partition(|c| c.featuretype == "exon");
    exons.sort_by_key(|e| e.start.unwrap_or(0));

    for exon in &exons {
        writeln!(out, "{}", exon.to_line())?;
    }
    for other in &non_exons {
        writeln!(out, "{}", other.to_line())?;
    }
    Ok(())
}

/// Write every gene in the store, in canonical order, preceded by any
/// recorded directives.
pub fn write_all<W: Write>(store: &Store, out: &mut W) -> Result<(), Error> {
    for directive in store.directives()? {
        writeln!(out, "{directive}")?;
    }
    for id in store.all_ids()? {
        if let Some(feature) = store.get_feature(&id)? {
            if feature.featuretype == "gene" {
                write_gene(store, &feature, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dialect::Dialect;
    use crate::feature::{Frame, Strand};

    fn sample(id: &str, featuretype: &str, start: i64, end: i64) -> Feature {
        let mut feature = Feature {
            id: id.to_string(),
            seqid: "chr1".to_string(),
            source: ".".to_string(),
            featuretype: featuretype.to_string(),
            start: Some(start),
            end: Some(end),
            score: ".".to_string(),
            strand: Strand::Plus,
            frame: Frame::Unset,
            attributes: crate::attrs::Attributes::new(),
            extra: Vec::new(),
            bin: 0,
            dialect: Dialect::gff3(),
        };
        feature.recompute_bin();
        feature
    }

    #[test]
    fn writes_gene_mrna_exon_in_canonical_order() -> Result<(), Error> {
        let temp = tempfile::TempDir::new()?;
        let store = Store::open_for_write(temp.path().join("db"))?;

        let gene = sample("gene1", "gene", 1, 1000);
        let mrna = sample("mRNA1", "mRNA", 1, 1000);
        let exon_a = sample("exon2", "exon", 500, 600);
        let exon_b = sample("exon1", "exon", 1, 100);

        for f in [&gene, &mrna, &exon_a, &exon_b] {
            store.put_feature(f)?;
        }
        store.put_relation("gene1", "mRNA1", Level::Direct)?;
        store.put_relation("mRNA1", "exon2", Level::Direct)?;
        store.put_relation("mRNA1", "exon1", Level::Direct)?;

        let mut buf = Vec::new();
        write_gene(&store, &gene, &mut buf)?;
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        let featuretypes: Vec<&str> = lines.iter().map(|l| l.split('\t').nth(2).unwrap()).collect();
        assert_eq!(featuretypes, vec!["gene", "mRNA", "exon", "exon"]);
        let exon_starts: Vec<&str> = lines[2..].iter().map(|l| l.split('\t').nth(3).unwrap()).collect();
        assert_eq!(exon_starts, vec!["1", "500"]);
        Ok(())
    }
}
