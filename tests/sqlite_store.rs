#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use tempfile::TempDir;
use work_records::error::StoreError;
use work_records::ingestion::{IngestionOptions, ingest, ingest_from_path};
use work_records::query::{QueryParams, RecordQuery};
use work_records::store::{MemoryStore, RecordStore, SqliteJournalMode, SqliteStore, SqliteStoreConfig};
use work_records::types::{REQUIRED_COLUMNS, RawTable, RawValue, Record, StoredRecord};

fn record(record_id: i64, quantity: i64, contractor: &str, day: u32) -> Record {
    Record {
        record_id,
        object_id: format!("OBJ-{record_id}"),
        work_type: "Painting".to_string(),
        period: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        quantity,
        unit_price: 2.5,
        total_cost: quantity as f64 * 2.5,
        contractor: contractor.to_string(),
    }
}

fn batch() -> Vec<Record> {
    vec![
        record(1, 5, "Acme", 1),
        record(2, 10, "Borealis", 2),
        record(3, 15, "Acme", 3),
        record(4, 20, "Acme", 4),
        record(5, 21, "Borealis", 5),
        record(6, 12, "Acme", 6),
    ]
}

fn open(dir: &TempDir) -> SqliteStore {
    SqliteStore::open(&SqliteStoreConfig::new(dir.path().join("nested").join("records.db"))).unwrap()
}

#[test]
fn commit_then_exact_match() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);

    assert_eq!(store.commit_batch(&batch()).unwrap(), 6);
    assert_eq!(store.count().unwrap(), 6);
    assert!(store.has_exact_match(&record(3, 15, "Acme", 3)).unwrap());

    let mut changed = record(3, 15, "Acme", 3);
    changed.total_cost += 0.01;
    assert!(!store.has_exact_match(&changed).unwrap());
}

#[test]
fn unique_index_rolls_back_the_whole_batch() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.commit_batch(&[record(1, 5, "Acme", 1)]).unwrap();

    let err = store
        .commit_batch(&[record(2, 10, "Borealis", 2), record(1, 5, "Acme", 1)])
        .unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)));
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn queries_match_the_memory_store() {
    let mut sqlite = SqliteStore::open_in_memory().unwrap();
    let mut memory = MemoryStore::new();
    sqlite.commit_batch(&batch()).unwrap();
    memory.commit_batch(&batch()).unwrap();

    let cases = [
        QueryParams::default(),
        QueryParams {
            quantity_min: Some(10.0),
            quantity_max: Some(20.0),
            ..Default::default()
        },
        QueryParams {
            contractor: Some("Acme".to_string()),
            date_from: NaiveDate::from_ymd_opt(2024, 3, 3),
            sort_by: Some("total_cost".to_string()),
            sort_order: Some("desc".to_string()),
            ..Default::default()
        },
        QueryParams {
            sort_by: Some("contractor".to_string()),
            limit: Some(3),
            offset: Some(1),
            ..Default::default()
        },
        QueryParams {
            sort_by: Some("no_such_field".to_string()),
            limit: Some(0),
            ..Default::default()
        },
    ];
    for params in cases {
        let query = params.clone().into_query().unwrap();
        assert_eq!(
            sqlite.query(&query).unwrap(),
            memory.query(&query).unwrap(),
            "params: {params:?}"
        );
    }
}

#[test]
fn rows_written_by_other_tools_may_hold_nulls() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .connection()
        .execute(
            "INSERT INTO records (record_id, object_id, period, quantity) VALUES (9, 'OBJ-9', '2024-03-09', NULL)",
            [],
        )
        .unwrap();
    store.commit_batch(&[record(1, 5, "Acme", 1)]).unwrap();

    let all = store.query(&RecordQuery::default()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].quantity, None);
    assert_eq!(all[0].contractor, None);

    let ranged = QueryParams {
        quantity_min: Some(0.0),
        ..Default::default()
    }
    .into_query()
    .unwrap();
    let rows: Vec<StoredRecord> = store.query(&ranged).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record_id, Some(1));
}

#[test]
fn reopening_keeps_committed_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.db");
    let config = SqliteStoreConfig {
        journal_mode: SqliteJournalMode::Delete,
        ..SqliteStoreConfig::new(&path)
    };
    {
        let mut store = SqliteStore::open(&config).unwrap();
        store.commit_batch(&batch()).unwrap();
    }
    let store = SqliteStore::open(&config).unwrap();
    assert_eq!(store.count().unwrap(), 6);
}

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let err = SqliteStore::open(&SqliteStoreConfig::new(dir.path())).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

#[test]
fn pipeline_runs_against_sqlite() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);

    let summary = ingest_from_path(&mut store, "tests/fixtures/works.csv", &IngestionOptions::default()).unwrap();
    assert_eq!(summary.inserted, 3);

    let again = ingest_from_path(&mut store, "tests/fixtures/works.csv", &IngestionOptions::default()).unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(store.count().unwrap(), 3);

    let cells = ["7", "OBJ-7", "Plastering", "2024-04-01", "1", "1", "1", "Acme"];
    let table = RawTable::new(
        REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        vec![cells.iter().map(|c| RawValue::Text(c.to_string())).collect()],
    );
    assert_eq!(ingest(&mut store, &table, &REQUIRED_COLUMNS).unwrap().inserted, 1);
}
