//! Collision resolution: the state machine applied when a synthesised id
//! already exists in `features`.

use crate::error::Error;
use crate::feature::{Feature, MERGE_COMPARISON_FIELDS};

/// How to resolve an id that already exists in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MergeStrategy {
    /// Raise a structured duplicate-id error.
    Error,
    /// Emit a warning and skip the new record.
    Warning,
    /// Overwrite every field of the stored record with the new one.
    Replace,
    /// Require non-attribute fields to agree; union attribute value lists.
    Merge,
    /// Mutate the new record's id by suffixing `_<n>`, then insert fresh.
    CreateUnique,
}

impl std::str::FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(MergeStrategy::Error),
            "warning" => Ok(MergeStrategy::Warning),
            "replace" => Ok(MergeStrategy::Replace),
            "merge" => Ok(MergeStrategy::Merge),
            "create_unique" => Ok(MergeStrategy::CreateUnique),
            other => Err(Error::InvalidMergeStrategy(other.to_string())),
        }
    }
}

/// The outcome of resolving a collision: either the existing record is
/// kept untouched (and the incoming one dropped, with an optional
/// warning), or a record should be written under some id.
pub enum Outcome {
    /// Drop the incoming record. Carries a human-readable warning when
    /// the policy is `warning`.
    Skip(Option<String>),
    /// Write `feature` under its own (possibly newly merged) id, replacing
    /// whatever was stored.
    Write(Feature),
    /// Write `feature` under a freshly minted id distinct from the
    /// existing record, which is left untouched.
    WriteNew(Feature),
}

/// Resolve a collision between `existing` (already in the store) and
/// `incoming` (about to be inserted) under `strategy`.
///
/// `line_no` is the source line of the incoming record, used in error
/// messages. `unique_counters` backs `create_unique`'s per-original-id
/// counter (distinct from the id synthesiser's per-type counters).
pub fn resolve(
    strategy: MergeStrategy,
    existing: &Feature,
    incoming: Feature,
    line_no: usize,
    unique_counters: &mut std::collections::HashMap<String, u64>,
) -> Result<Outcome, Error> {
    match strategy {
        MergeStrategy::Error => Err(Error::DuplicateId { id: incoming.id.clone(), line: line_no }),
        MergeStrategy::Warning => {
            Ok(Outcome::Skip(Some(format!("duplicate id '{}' on line {line_no}, skipping", incoming.id))))
        }
        MergeStrategy::Replace => Ok(Outcome::Write(incoming)),
        MergeStrategy::Merge => {
            if let Some(field) = existing.first_mismatched_field(&incoming) {
                return Err(Error::MergeConflict {
                    field: merge_field_name(field),
                    id: incoming.id.clone(),
                    line: line_no,
                });
            }
            let mut merged = existing.clone();
            merged.attributes.merge_from(&incoming.attributes);
            for extra in incoming.extra {
                if !merged.extra.contains(&extra) {
                    merged.extra.push(extra);
                }
            }
            Ok(Outcome::Write(merged))
        }
        MergeStrategy::CreateUnique => {
            let counter = unique_counters.entry(incoming.id.clone()).or_insert(0);
            *counter += 1;
            let mut fresh = incoming;
            fresh.id = format!("{}_{}", fresh.id, counter);
            Ok(Outcome::WriteNew(fresh))
        }
    }
}

fn merge_field_name(field: &'static str) -> &'static str {
    debug_assert!(MERGE_COMPARISON_FIELDS.contains(&field));
    field
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::attrs::Attributes;
    use crate::dialect::Dialect;
    use crate::feature::{Frame, Strand};

    fn sample(id: &str, start: i64) -> Feature {
        let mut attributes = Attributes::new();
        attributes.push("ID", id);
        Feature {
            id: id.to_string(),
            seqid: "chr1".to_string(),
            source: ".".to_string(),
            featuretype: "gene".to_string(),
            start: Some(start),
            end: Some(start + 99),
            score: ".".to_string(),
            strand: Strand::Plus,
            frame: Frame::Unset,
            attributes,
            extra: Vec::new(),
            bin: 0,
            dialect: Dialect::gff3(),
        }
    }

    #[test]
    fn error_policy_raises_duplicate_id() {
        let mut counters = std::collections::HashMap::new();
        let existing = sample("x", 1);
        let incoming = sample("x", 1);
        let err = resolve(MergeStrategy::Error, &existing, incoming, 5, &mut counters);
        assert!(matches!(err, Err(Error::DuplicateId { line: 5, .. })));
    }

    #[test]
    fn merge_requires_non_attribute_fields_to_agree() {
        let mut counters = std::collections::HashMap::new();
        let existing = sample("x", 1);
        let incoming = sample("x", 2);
        let err = resolve(MergeStrategy::Merge, &existing, incoming, 9, &mut counters);
        assert!(matches!(err, Err(Error::MergeConflict { field: "start", line: 9, .. })));
    }

    #[test]
    fn merge_unions_attribute_values() {
        let mut counters = std::collections::HashMap::new();
        let existing = sample("x", 1);
        let mut incoming = sample("x", 1);
        incoming.attributes.push("Note", "extra");
        match resolve(MergeStrategy::Merge, &existing, incoming, 1, &mut counters).unwrap() {
            Outcome::Write(merged) => {
                assert_eq!(merged.attributes.get("ID"), Some(&["x".to_string()][..]));
                assert_eq!(merged.attributes.get_first("Note"), Some("extra"));
            }
            _ => panic!("expected Write"),
        }
    }

    #[test]
    fn create_unique_mints_suffixed_ids_keyed_on_original() {
        let mut counters = std::collections::HashMap::new();
        let existing = sample("x", 1);
        let incoming = sample("x", 2);
        match resolve(MergeStrategy::CreateUnique, &existing, incoming, 1, &mut counters).unwrap() {
            Outcome::WriteNew(f) => assert_eq!(f.id, "x_1"),
            _ => panic!("expected WriteNew"),
        }
        let incoming2 = sample("x", 3);
        match resolve(MergeStrategy::CreateUnique, &existing, incoming2, 2, &mut counters).unwrap() {
            Outcome::WriteNew(f) => assert_eq!(f.id, "x_2"),
            _ => panic!("expected WriteNew"),
        }
    }

    #[test]
    fn warning_policy_skips_without_error() {
        let mut counters = std::collections::HashMap::new();
        let existing = sample("x", 1);
        let incoming = sample("x", 2);
        match resolve(MergeStrategy::Warning, &existing, incoming, 1, &mut counters).unwrap() {
            Outcome::Skip(Some(_)) => {}
            _ => panic!("expected Skip"),
        }
    }
}
