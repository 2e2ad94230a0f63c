use work_records::ingestion::json::{decode_json_from_bytes, decode_json_from_path, decode_json_from_str};
use work_records::ingestion::{IngestionOptions, ingest_from_path};
use work_records::query::{QueryParams, export_json};
use work_records::store::{MemoryStore, RecordStore};
use work_records::types::RawValue;

#[test]
fn decode_json_array_from_path_happy_path() {
    let t = decode_json_from_path("tests/fixtures/works.json").unwrap();

    assert_eq!(t.row_count(), 2);
    assert_eq!(t.columns.len(), 8);
    let first: Vec<_> = t.iter_rows().collect();
    assert_eq!(first[0].get("record_id"), &RawValue::Int(1));
    assert_eq!(first[0].get("unit_price"), &RawValue::Float(1234.56));
    assert_eq!(first[1].get("period"), &RawValue::Null);
}

#[test]
fn decode_json_ndjson_happy_path() {
    let input = r#"
{"record_id":1,"contractor":"Ada"}
{"record_id":2,"contractor":"Grace","extra":true}
"#;
    let t = decode_json_from_str(input).unwrap();
    assert_eq!(t.row_count(), 2);
    assert!(t.index_of("extra").is_some());
    let rows: Vec<_> = t.iter_rows().collect();
    assert_eq!(rows[0].get("extra"), &RawValue::Null);
    assert_eq!(rows[1].get("extra"), &RawValue::Bool(true));
}

#[test]
fn decode_json_rejects_non_objects_and_bad_utf8() {
    let err = decode_json_from_str("[1, 2]").unwrap_err();
    assert!(err.to_string().contains("not a json object"));
    assert!(decode_json_from_bytes(b"\xff").is_err());
    assert!(decode_json_from_str("   ").is_err());
}

#[test]
fn json_row_with_null_period_is_rejected_not_fatal() {
    let mut store = MemoryStore::new();
    let summary = ingest_from_path(&mut store, "tests/fixtures/works.json", &IngestionOptions::default()).unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].row, 3);
    assert_eq!(summary.errors[0].error, "field 'period' is empty");
}

#[test]
fn export_document_reads_back_as_duplicates() {
    let mut store = MemoryStore::new();
    ingest_from_path(&mut store, "tests/fixtures/works.json", &IngestionOptions::default()).unwrap();

    let rows = store.query(&QueryParams::default().into_query().unwrap()).unwrap();
    let doc = export_json(&rows).unwrap();
    let table = decode_json_from_bytes(&doc.bytes).unwrap();

    let again = work_records::ingestion::ingest(&mut store, &table, &work_records::types::REQUIRED_COLUMNS).unwrap();
    assert_eq!(again.inserted, 0);
    assert!(again.errors.iter().all(|e| e.is_duplicate()));
}
