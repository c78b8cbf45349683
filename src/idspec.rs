//! Identifier synthesis: resolves a record's primary key from a
//! user-supplied specification, falling back to per-type auto-increment
//! counters.

use crate::feature::Feature;

/// Sentinel value a [`Function`](IdSpec::Function) spec may return to
/// request an auto-increment counter under an explicit key, rather than
/// the record's own feature-type.
const AUTOINCREMENT_PREFIX: &str = "autoincrement:";

/// A callback id spec: given a record, return either an id, an empty
/// string (fall through to auto-increment), or `"autoincrement:<key>"`.
pub type IdFn = Box<dyn Fn(&Feature) -> String>;

/// The four id-spec kinds from `create.py`'s `_id_handler`, modelled as a
/// tagged variant rather than runtime type dispatch.
pub enum IdSpec {
    /// Use this literal text as a single-element candidate list.
    Scalar(String),
    /// Try each attribute key (or `:field:` sentinel) in order; first
    /// non-empty value wins.
    Keys(Vec<String>),
    /// Look up the record's feature-type in this mapping; absent ⇒
    /// auto-increment on feature-type.
    ByType(std::collections::HashMap<String, Box<IdSpec>>),
    /// Invoke a callback with the record.
    Function(IdFn),
}

/// What an id spec resolved to, before an autoincrement counter (if
/// needed) has actually been drawn.
enum Resolution {
    /// A concrete id.
    Id(String),
    /// Fall through to auto-increment on the record's feature-type.
    AutoIncrementOnType,
    /// Fall through to auto-increment on an explicit counter key.
    AutoIncrementOnKey(String),
}

/// Resolve one `:field:`-sentinel or attribute-key candidate against a
/// record. Returns `None` when the candidate should be skipped (sentinel
/// field unset as text, or attribute key absent/empty).
fn resolve_candidate(feature: &Feature, key: &str) -> Option<String> {
    match key {
        ":seqid:" => Some(feature.seqid.clone()),
        ":start:" => feature.start.map(|v| v.to_string()),
        ":end:" => feature.end.map(|v| v.to_string()),
        ":strand:" => Some(feature.strand.to_string()),
        ":source:" => Some(feature.source.clone()),
        ":featuretype:" => Some(feature.featuretype.clone()),
        ":score:" => Some(feature.score.clone()),
        ":frame:" => Some(feature.frame.to_string()),
        _ => feature.attributes.get_first(key).map(str::to_string),
    }
}

fn resolve_inner(spec: &IdSpec, feature: &Feature) -> Resolution {
    match spec {
        IdSpec::Scalar(text) => Resolution::Id(text.clone()),
        IdSpec::Keys(keys) => {
            for key in keys {
                if let Some(value) = resolve_candidate(feature, key) {
                    if !value.is_empty() {
                        return Resolution::Id(value);
                    }
                }
            }
            Resolution::AutoIncrementOnType
        }
        IdSpec::ByType(mapping) => match mapping.get(&feature.featuretype) {
            Some(nested) => resolve_inner(nested, feature),
            None => Resolution::AutoIncrementOnType,
        },
        IdSpec::Function(f) => {
            let result = f(feature);
            if result.is_empty() {
                Resolution::AutoIncrementOnType
            } else if let Some(key) = result.strip_prefix(AUTOINCREMENT_PREFIX) {
                Resolution::AutoIncrementOnKey(key.to_string())
            } else {
                Resolution::Id(result)
            }
        }
    }
}

/// Draws the next value for `key` from `counters`, post-incrementing it
/// (the counter holds "next value to issue", consistent with the
/// `autoincrements` store table).
pub fn next_counter(counters: &mut std::collections::HashMap<String, u64>, key: &str) -> u64 {
    let entry = counters.entry(key.to_string()).or_insert(0);
    *entry += 1;
    *entry
}

/// Resolve `spec` against `feature`, drawing from `counters` if the
/// resolution falls through to auto-increment. Returns the synthesised
/// id.
pub fn resolve(
    spec: &IdSpec,
    feature: &Feature,
    counters: &mut std::collections::HashMap<String, u64>,
) -> String {
    match resolve_inner(spec, feature) {
        Resolution::Id(id) => id,
        Resolution::AutoIncrementOnType => {
            let n = next_counter(counters, &feature.featuretype);
            format!("{}_{}", feature.featuretype, n)
        }
        Resolution::AutoIncrementOnKey(key) => {
            let n = next_counter(counters, &key);
            format!("{key}_{n}")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::attrs::Attributes;
    use crate::dialect::Dialect;

    fn feature_with(featuretype: &str, attrs: &[(&str, &str)]) -> Feature {
        let mut attributes = Attributes::new();
        for (k, v) in attrs {
            attributes.push(*k, *v);
        }
        Feature {
            id: String::new(),
            seqid: "chr1".to_string(),
            source: ".".to_string(),
            featuretype: featuretype.to_string(),
            start: Some(1),
            end: Some(100),
            score: ".".to_string(),
            strand: crate::feature::Strand::Unset,
            frame: crate::feature::Frame::Unset,
            attributes,
            extra: Vec::new(),
            bin: 0,
            dialect: Dialect::gff3(),
        }
    }

    #[test]
    fn scalar_spec_is_literal() {
        let mut counters = std::collections::HashMap::new();
        let feature = feature_with("gene", &[]);
        assert_eq!(resolve(&IdSpec::Scalar("fixed".to_string()), &feature, &mut counters), "fixed");
    }

    #[test]
    fn keys_spec_tries_candidates_in_order() {
        let mut counters = std::collections::HashMap::new();
        let feature = feature_with("gene", &[("Name", "foo")]);
        let spec = IdSpec::Keys(vec!["ID".to_string(), "Name".to_string()]);
        assert_eq!(resolve(&spec, &feature, &mut counters), "foo");
    }

    #[test]
    fn keys_spec_falls_through_to_autoincrement_on_type() {
        let mut counters = std::collections::HashMap::new();
        let feature = feature_with("gene", &[]);
        let spec = IdSpec::Keys(vec!["ID".to_string()]);
        assert_eq!(resolve(&spec, &feature, &mut counters), "gene_1");
        let feature2 = feature_with("gene", &[]);
        assert_eq!(resolve(&spec, &feature2, &mut counters), "gene_2");
    }

    #[test]
    fn sentinel_field_resolves_directly() {
        let mut counters = std::collections::HashMap::new();
        let feature = feature_with("gene", &[]);
        let spec = IdSpec::Keys(vec![":seqid:".to_string()]);
        assert_eq!(resolve(&spec, &feature, &mut counters), "chr1");
    }

    #[rstest::rstest]
    #[case(":seqid:", "chr1")]
    #[case(":start:", "1")]
    #[case(":end:", "100")]
    #[case(":strand:", ".")]
    #[case(":source:", ".")]
    #[case(":featuretype:", "gene")]
    #[case(":score:", ".")]
    #[case(":frame:", ".")]
    fn every_sentinel_field_resolves_from_the_record(#[case] sentinel: &str, #[case] expected: &str) {
        let mut counters = std::collections::HashMap::new();
        let feature = feature_with("gene", &[]);
        let spec = IdSpec::Keys(vec![sentinel.to_string()]);
        assert_eq!(resolve(&spec, &feature, &mut counters), expected);
    }

    #[test]
    fn by_type_dispatches_on_feature_type() {
        let mut counters = std::collections::HashMap::new();
        let mut mapping = std::collections::HashMap::new();
        mapping.insert("gene".to_string(), Box::new(IdSpec::Keys(vec!["ID".to_string()])));
        let feature = feature_with("gene", &[("ID", "g1")]);
        let spec = IdSpec::ByType(mapping);
        assert_eq!(resolve(&spec, &feature, &mut counters), "g1");
    }

    #[test]
    fn function_spec_can_request_autoincrement_under_a_key() {
        let mut counters = std::collections::HashMap::new();
        let feature = feature_with("exon", &[]);
        let spec = IdSpec::Function(Box::new(|_f| "autoincrement:exon_custom".to_string()));
        assert_eq!(resolve(&spec, &feature, &mut counters), "exon_custom_1");
    }
}
