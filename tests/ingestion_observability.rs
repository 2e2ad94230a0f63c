use std::sync::{Arc, Mutex};

use work_records::IngestionError;
use work_records::ingestion::{
    IngestionContext, IngestionFormat, IngestionObserver, IngestionOptions, IngestionSeverity, IngestionStats,
    RowError, ingest_from_path,
};
use work_records::store::MemoryStore;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<IngestionStats>>,
    rejected_rows: Mutex<Vec<usize>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, _ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_row_rejected(&self, _ctx: &IngestionContext, row: &RowError) {
        self.rejected_rows.lock().unwrap().push(row.row);
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn options(obs: &Arc<RecordingObserver>) -> IngestionOptions {
    IngestionOptions {
        format: Some(IngestionFormat::Csv),
        observer: Some(obs.clone()),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    }
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let mut store = MemoryStore::new();

    // Missing file -> Io error -> Critical
    let _ = ingest_from_path(&mut store, "tests/fixtures/does_not_exist.csv", &options(&obs)).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Critical]);
    assert!(obs.successes.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_without_alert_for_missing_columns() {
    let obs = Arc::new(RecordingObserver::default());
    let mut store = MemoryStore::new();

    // A JSON document read as CSV has none of the required headers.
    let _ = ingest_from_path(&mut store, "tests/fixtures/works.json", &options(&obs)).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn lower_threshold_alerts_on_non_critical_failures() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        alert_at_or_above: IngestionSeverity::Error,
        ..options(&obs)
    };
    let mut store = MemoryStore::new();
    let _ = ingest_from_path(&mut store, "tests/fixtures/works.json", &opts).unwrap_err();

    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Error]);
}

#[test]
fn observer_receives_rejected_rows_then_success_stats() {
    let obs = Arc::new(RecordingObserver::default());
    let mut store = MemoryStore::new();

    let summary = ingest_from_path(&mut store, "tests/fixtures/works.csv", &options(&obs)).unwrap();

    assert_eq!(*obs.rejected_rows.lock().unwrap(), vec![5, 6]);
    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec![IngestionStats {
            total_rows: summary.total_rows,
            inserted: 3,
            rejected: 2,
        }]
    );
    assert!(obs.failures.lock().unwrap().is_empty());
}
