//! The read-side query boundary: fetch by id, genealogical traversal,
//! and region lookup.

use crate::error::Error;
use crate::feature::Feature;
use crate::store::keys::Level;
use crate::store::Store;

/// Fetch one feature by id.
pub fn by_id(store: &Store, id: &str) -> Result<Feature, Error> {
    store.get_feature(id)?.ok_or_else(|| Error::NotFound(id.to_string()))
}

/// Fetch the direct or transitive children of `id`.
pub fn children(store: &Store, id: &str, level: Level) -> Result<Vec<Feature>, Error> {
    store
        .children(id, level)?
        .into_iter()
        .map(|child_id| by_id(store, &child_id))
        .collect()
}

/// Fetch the direct or transitive parents of `id`.
pub fn parents(store: &Store, id: &str, level: Level) -> Result<Vec<Feature>, Error> {
    store
        .parents(id, level)?
        .into_iter()
        .map(|parent_id| by_id(store, &parent_id))
        .collect()
}

/// Fetch every feature on `seqid` whose `[start, end]` inclusively
/// overlaps the query range `[start, end]`. The bin index narrows
/// candidates to the same sequence; overlap itself is checked against
/// each candidate's actual extent.
pub fn region(store: &Store, seqid: &str, start: i64, end: i64) -> Result<Vec<Feature>, Error> {
    let mut hits = Vec::new();
    for id in store.ids_for_seqid(seqid)? {
        let Some(feature) = store.get_feature(&id)? else { continue };
        if let (Some(f_start), Some(f_end)) = (feature.start, feature.end) {
            if f_start <= end && f_end >= start {
                hits.push(feature);
            }
        }
    }
    Ok(hits)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dialect::Dialect;
    use crate::feature::{Frame, Strand};

    fn sample(id: &str, start: i64, end: i64) -> Feature {
        let mut feature = Feature {
            id: id.to_string(),
            seqid: "chr1".to_string(),
            source: ".".to_string(),
            featuretype: "gene".to_string(),
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
    fn region_includes_boundary_overlap_and_excludes_disjoint() -> Result<(), Error> {
        let temp = tempfile::TempDir::new()?;
        let store = Store::open_for_write(temp.path().join("db"))?;
        let feature = sample("gene1", 69091, 69093);
        store.put_feature(&feature)?;
        store.put_bin_index(&feature)?;

        let hits = region(&store, "chr1", 69090, 69093)?;
        assert_eq!(hits.len(), 1);

        let misses = region(&store, "chr1", 69087, 69090)?;
        assert!(misses.is_empty());
        Ok(())
    }

    #[test]
    fn by_id_reports_not_found() -> Result<(), Error> {
        let temp = tempfile::TempDir::new()?;
        let store = Store::open_for_write(temp.path().join("db"))?;
        assert!(matches!(by_id(&store, "nope"), Err(Error::NotFound(_))));
        Ok(())
    }
}
