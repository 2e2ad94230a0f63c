use work_records::ingestion::csv::{decode_csv_from_bytes, decode_csv_from_path, decode_csv_from_reader};
use work_records::ingestion::{IngestionFormat, IngestionOptions, ingest_from_path};
use work_records::store::{MemoryStore, RecordStore};
use work_records::types::RawValue;

#[test]
fn decode_csv_from_path_keeps_header_and_raw_text() {
    let t = decode_csv_from_path("tests/fixtures/works.csv", b',').unwrap();

    assert_eq!(t.columns.len(), 9);
    assert_eq!(t.columns[8], "note");
    assert_eq!(t.row_count(), 5);
    assert_eq!(t.rows[0][5], RawValue::Text("1 234,56".to_string()));
    assert_eq!(t.rows[1][8], RawValue::Null);
}

#[test]
fn decode_csv_trims_header_names_only() {
    let input = " record_id , object_id \n 7 , OBJ-7 \n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let t = decode_csv_from_reader(&mut rdr).unwrap();
    assert_eq!(t.columns, vec!["record_id", "object_id"]);
    assert_eq!(t.rows[0][0], RawValue::Text(" 7 ".to_string()));
}

#[test]
fn decode_csv_errors_on_invalid_utf8() {
    let err = decode_csv_from_bytes(b"a,b\n\xff\xfe,1\n", b',').unwrap_err();
    assert!(err.to_string().contains("csv error"));
}

#[test]
fn csv_fixture_ingests_end_to_end() {
    let mut store = MemoryStore::new();
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        ..Default::default()
    };

    let summary = ingest_from_path(&mut store, "tests/fixtures/works.csv", &opts).unwrap();
    assert_eq!(summary.total_rows, 5);
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.errors.len(), 2);
    assert_eq!(summary.errors[0].row, 5);
    assert!(summary.errors[0].is_duplicate());
    assert_eq!(summary.errors[1].row, 6);
    assert!(summary.errors[1].error.contains("object_id"));

    let first = &store.rows()[0];
    assert_eq!(first.total_cost, Some(14_814.72));
    assert_eq!(store.count().unwrap(), 3);
}
