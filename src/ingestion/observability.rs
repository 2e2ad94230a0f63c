use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::error::IngestionError;

use super::pipeline::RowError;
use super::unified::IngestionFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, e.g. a rejected row).
    Warning,
    /// Error-level event (batch failed: bad source or missing columns).
    Error,
    /// Critical error (I/O or storage failures).
    Critical,
}

impl IngestionSeverity {
    /// Severity of a batch-level ingestion failure.
    pub fn for_error(e: &IngestionError) -> Self {
        match e {
            IngestionError::Io(_) | IngestionError::Store(_) | IngestionError::Commit(_) => {
                Self::Critical
            }
            IngestionError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => Self::Critical,
                _ => Self::Error,
            },
            #[cfg(feature = "excel")]
            IngestionError::Excel(_) => Self::Error,
            IngestionError::Json(_)
            | IngestionError::Decode { .. }
            | IngestionError::MissingColumns { .. } => Self::Error,
        }
    }
}

/// Context about an ingestion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionContext {
    /// Where the rows came from (file path, upload name, or a caller label).
    pub source: String,
    /// Format the source was decoded with, when it came from a document.
    pub format: Option<IngestionFormat>,
}

impl IngestionContext {
    /// Context for rows that did not come from a decoded document.
    pub fn table(label: impl Into<String>) -> Self {
        Self {
            source: label.into(),
            format: None,
        }
    }

    /// Context for a decoded document.
    pub fn document(source: impl Into<String>, format: IngestionFormat) -> Self {
        Self {
            source: source.into(),
            format: Some(format),
        }
    }

    fn format_label(&self) -> String {
        self.format.map_or_else(|| "table".to_string(), |f| format!("{f:?}"))
    }
}

/// Stats reported on a completed (committed) ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Data rows in the source table.
    pub total_rows: usize,
    /// Rows committed.
    pub inserted: usize,
    /// Rows skipped for a bad field or as duplicates.
    pub rejected: usize,
}

/// Observer interface for ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a batch commits.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called for each row skipped by the pipeline.
    fn on_row_rejected(&self, _ctx: &IngestionContext, _row: &RowError) {}

    /// Called when ingestion fails at the batch level.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a batch failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }

    /// Number of wrapped observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if no observers are wrapped.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_row_rejected(&self, ctx: &IngestionContext, row: &RowError) {
        for o in &self.observers {
            o.on_row_rejected(ctx, row);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs ingestion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl IngestionObserver for StdErrObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        eprintln!(
            "[ingest][ok] format={} source={} rows={} inserted={} rejected={}",
            ctx.format_label(),
            ctx.source,
            stats.total_rows,
            stats.inserted,
            stats.rejected
        );
    }

    fn on_row_rejected(&self, ctx: &IngestionContext, row: &RowError) {
        eprintln!(
            "[ingest][row] source={} row={} err={}",
            ctx.source, row.row, row.error
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        eprintln!(
            "[ingest][{:?}] format={} source={} err={}",
            severity,
            ctx.format_label(),
            ctx.source,
            error
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        eprintln!(
            "[ALERT][ingest][{:?}] format={} source={} err={}",
            severity,
            ctx.format_label(),
            ctx.source,
            error
        );
    }
}

/// Appends ingestion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "{} ok format={} source={} rows={} inserted={} rejected={}",
            unix_ts(),
            ctx.format_label(),
            ctx.source,
            stats.total_rows,
            stats.inserted,
            stats.rejected
        ));
    }

    fn on_row_rejected(&self, ctx: &IngestionContext, row: &RowError) {
        self.append_line(&format!(
            "{} row source={} row={} err={}",
            unix_ts(),
            ctx.source,
            row.row,
            row.error
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} fail severity={:?} format={} source={} err={}",
            unix_ts(),
            severity,
            ctx.format_label(),
            ctx.source,
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} format={} source={} err={}",
            unix_ts(),
            severity,
            ctx.format_label(),
            ctx.source,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
