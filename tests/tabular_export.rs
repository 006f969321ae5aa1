use column_matcher::batch::{BatchFailure, BatchReply, FailureKind, ResultCollection};
use column_matcher::tabular::{read_column, write_csv, write_json};
use column_matcher::{Error, MatchRecord};
use std::fs;

fn sample_collection() -> ResultCollection {
    let mut collection = ResultCollection::new(2);
    collection.merge(BatchReply::parsed(
        0,
        vec![
            MatchRecord::new(0, "apple", "Apple"),
            MatchRecord::new(0, "Cherry, ripe", ""),
        ],
    ));
    collection.add_failure(BatchFailure::new(1, FailureKind::Transport, "timeout"));
    collection
}

#[test]
fn test_read_column_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.csv");
    fs::write(&path, "Code,Name\n1,Apple\n2,Banana\n3,Apple\n4,\n").unwrap();

    assert_eq!(read_column(&path, "Name").unwrap(), vec!["Apple", "Banana"]);

    let err = read_column(&path, "Price").unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    let ctx = err.context().unwrap();
    assert_eq!(ctx.source.as_deref(), Some(path.display().to_string().as_str()));
}

#[test]
fn test_read_column_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_column(dir.path().join("absent.csv"), "Name").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_write_json_uses_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ColumnMatcher.json");
    write_json(&path, &sample_collection(), "Fruit", "Catalog").unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\n    {"));
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        doc,
        serde_json::json!([
            { "Fruit": "apple", "Catalog": "Apple" },
            { "Fruit": "Cherry, ripe", "Catalog": "" }
        ])
    );
}

#[test]
fn test_write_csv_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ColumnMatcher.csv");
    write_csv(&path, &sample_collection(), "Fruit", "Catalog").unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.starts_with("Fruit,Catalog\n"));
    assert!(raw.contains("\"Cherry, ripe\","));

    // Blank matches survive as empty cells but are skipped by the reader.
    assert_eq!(read_column(&path, "Fruit").unwrap(), vec!["apple", "Cherry, ripe"]);
    assert_eq!(read_column(&path, "Catalog").unwrap(), vec!["Apple"]);
}
