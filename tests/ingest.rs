//! End-to-end ingestion scenarios, covering the duplicate-id policies and
//! the malformed/placeholder-line edge cases that aren't already
//! exercised by a unit test closer to the code they touch.

use annodb::collision::MergeStrategy;
use annodb::idspec::IdSpec;
use annodb::ingest::{self, IngestConfig};
use annodb::query;
use annodb::store::Store;

fn config(path: &std::path::Path, merge_strategy: MergeStrategy) -> IngestConfig {
    IngestConfig {
        path_out: path.to_path_buf(),
        merge_strategy,
        id_spec: IdSpec::Keys(vec!["ID".to_string()]),
        ..IngestConfig::default()
    }
}

#[test]
fn duplicate_under_create_unique_mints_suffixed_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let text = "\
chr1\t.\tgene\t1\t100\t.\t+\t.\tID=x
chr1\t.\tgene\t200\t300\t.\t+\t.\tID=x
";
    let summary = ingest::ingest_string(text, config(&path, MergeStrategy::CreateUnique)).unwrap();
    assert_eq!(summary.features_seen, 2);

    let store = Store::open_for_read(&path).unwrap();
    let original = query::by_id(&store, "x").unwrap();
    assert_eq!(original.start, Some(1));
    let renamed = query::by_id(&store, "x_1").unwrap();
    assert_eq!(renamed.start, Some(200));
}

#[test]
fn duplicate_under_merge_with_divergent_start_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let text = "\
chr1\t.\tgene\t1\t100\t.\t+\t.\tID=x
chr1\t.\tgene\t5\t100\t.\t+\t.\tID=x
";
    let err = ingest::ingest_string(text, config(&path, MergeStrategy::Merge)).unwrap_err();
    match err {
        annodb::Error::MergeConflict { field, id, .. } => {
            assert_eq!(field, "start");
            assert_eq!(id, "x");
        }
        other => panic!("expected MergeConflict, got {other:?}"),
    }
}

#[test]
fn duplicate_under_merge_with_agreeing_fields_unions_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let text = "\
chr1\t.\tgene\t1\t100\t.\t+\t.\tID=x;Note=first
chr1\t.\tgene\t1\t100\t.\t+\t.\tID=x;Note=second
";
    ingest::ingest_string(text, config(&path, MergeStrategy::Merge)).unwrap();

    let store = Store::open_for_read(&path).unwrap();
    let merged = query::by_id(&store, "x").unwrap();
    assert_eq!(merged.attributes.get("Note"), Some(&["first".to_string(), "second".to_string()][..]));
}

#[test]
fn duplicate_under_error_policy_aborts_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let text = "\
chr1\t.\tgene\t1\t100\t.\t+\t.\tID=x
chr1\t.\tgene\t1\t100\t.\t+\t.\tID=x
";
    let err = ingest::ingest_string(text, config(&path, MergeStrategy::Error)).unwrap_err();
    assert!(matches!(err, annodb::Error::DuplicateId { id, .. } if id == "x"));
}

#[test]
fn empty_column_record_round_trips_as_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let text = ".\t.\t.\t.\t.\t.\t.\t.\t.\n";
    let summary = ingest::ingest_string(text, config(&path, MergeStrategy::Error)).unwrap();
    assert_eq!(summary.features_seen, 1);

    let store = Store::open_for_read(&path).unwrap();
    let ids = store.all_ids().unwrap();
    assert_eq!(ids.len(), 1);
    let placeholder = query::by_id(&store, &ids[0]).unwrap();
    assert_eq!(placeholder.start, None);
    assert_eq!(placeholder.to_line(), ".\t.\t.\t.\t.\t.\t.\t.\t.");
}

#[test]
fn empty_input_is_a_silent_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let summary = ingest::ingest_string("", config(&path, MergeStrategy::Error)).unwrap();
    assert_eq!(summary.features_seen, 0);

    let store = Store::open_for_read(&path).unwrap();
    assert!(store.all_ids().unwrap().is_empty());
}
