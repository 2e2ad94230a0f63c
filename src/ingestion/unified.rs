//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`] or [`ingest_from_bytes`], which decode a document
//! into a [`RawTable`] and run the [`super::pipeline`] against a [`RecordStore`].
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension.
//! - If an [`super::observability::IngestionObserver`] is provided, success, rejected rows,
//!   failures and alerts are reported to it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};
use crate::store::RecordStore;
use crate::types::{REQUIRED_COLUMNS, RawTable};

use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::pipeline::{IngestionSummary, ParseMode, ingest_with_mode};
use super::{csv, json};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values (delimiter configurable).
    Csv,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse a format from a file extension or format name (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" | "excel" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> IngestionResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| IngestionError::Decode {
                message: format!(
                    "cannot infer format: path has no extension ({})",
                    path.display()
                ),
            })?;

        Self::from_extension(ext).ok_or_else(|| IngestionError::Decode {
            message: format!(
                "cannot infer format from extension '{ext}' for path ({})",
                path.display()
            ),
        })
    }
}

/// How to choose sheet(s) when decoding an Excel workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExcelSheetSelection {
    /// Decode the first sheet (default).
    #[default]
    First,
    /// Decode a single named sheet.
    Sheet(String),
    /// Decode all sheets and concatenate rows. Headers must agree.
    AllSheets,
    /// Decode only the listed sheets (in order) and concatenate rows.
    Sheets(Vec<String>),
}

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// Excel-specific options.
    pub excel_sheet_selection: ExcelSheetSelection,
    /// CSV field delimiter.
    pub csv_delimiter: u8,
    /// Parse rows on the rayon pool.
    pub parallel_parse: bool,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("excel_sheet_selection", &self.excel_sheet_selection)
            .field("csv_delimiter", &(self.csv_delimiter as char))
            .field("parallel_parse", &self.parallel_parse)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            excel_sheet_selection: ExcelSheetSelection::default(),
            csv_delimiter: b',',
            parallel_parse: false,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl IngestionOptions {
    fn parse_mode(&self) -> ParseMode {
        if self.parallel_parse {
            ParseMode::Parallel
        } else {
            ParseMode::Sequential
        }
    }
}

/// Decode a document on disk into a [`RawTable`] without ingesting it.
pub fn decode_from_path(
    path: impl AsRef<Path>,
    format: IngestionFormat,
    options: &IngestionOptions,
) -> IngestionResult<RawTable> {
    let path = path.as_ref();
    match format {
        IngestionFormat::Csv => csv::decode_csv_from_path(path, options.csv_delimiter),
        IngestionFormat::Json => json::decode_json_from_path(path),
        IngestionFormat::Excel => decode_excel_path(path, &options.excel_sheet_selection),
    }
}

/// Decode an in-memory document into a [`RawTable`] without ingesting it.
pub fn decode_from_bytes(
    bytes: Vec<u8>,
    format: IngestionFormat,
    options: &IngestionOptions,
) -> IngestionResult<RawTable> {
    match format {
        IngestionFormat::Csv => csv::decode_csv_from_bytes(&bytes, options.csv_delimiter),
        IngestionFormat::Json => json::decode_json_from_bytes(&bytes),
        IngestionFormat::Excel => decode_excel_bytes(bytes, &options.excel_sheet_selection),
    }
}

/// Run the pipeline over an already-decoded table and report the outcome.
///
/// When an observer is configured, this function reports:
///
/// - `on_row_rejected` once per skipped row, then `on_success` with row stats, after a commit
/// - `on_failure` on a batch-level failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
pub fn ingest_table<S: RecordStore + ?Sized>(
    store: &mut S,
    table: &RawTable,
    ctx: &IngestionContext,
    options: &IngestionOptions,
) -> IngestionResult<IngestionSummary> {
    let result = ingest_with_mode(store, table, &REQUIRED_COLUMNS, options.parse_mode());
    report(ctx, options, &result);
    result
}

/// Decode a file and ingest it into `store`.
///
/// # Examples
///
/// ## CSV (auto-detect by extension)
///
/// ```no_run
/// use work_records::ingestion::{ingest_from_path, IngestionOptions};
/// use work_records::store::MemoryStore;
///
/// # fn main() -> Result<(), work_records::IngestionError> {
/// let mut store = MemoryStore::new();
/// let summary = ingest_from_path(&mut store, "works.csv", &IngestionOptions::default())?;
/// println!("inserted={} rejected={}", summary.inserted, summary.errors.len());
/// # Ok(())
/// # }
/// ```
///
/// ## Excel sheet selection (feature-gated)
///
/// ```no_run
/// use work_records::ingestion::{
///     ingest_from_path, ExcelSheetSelection, IngestionFormat, IngestionOptions,
/// };
/// use work_records::store::MemoryStore;
///
/// # fn main() -> Result<(), work_records::IngestionError> {
/// let opts = IngestionOptions {
///     format: Some(IngestionFormat::Excel),
///     excel_sheet_selection: ExcelSheetSelection::Sheet("March".to_string()),
///     ..Default::default()
/// };
///
/// let mut store = MemoryStore::new();
/// let summary = ingest_from_path(&mut store, "works.xlsx", &opts)?;
/// println!("rows={}", summary.total_rows);
/// # Ok(())
/// # }
/// ```
///
/// ## Observability (stderr logging + alert threshold)
///
/// ```no_run
/// use std::sync::Arc;
///
/// use work_records::ingestion::{
///     ingest_from_path, IngestionOptions, IngestionSeverity, StdErrObserver,
/// };
/// use work_records::store::MemoryStore;
///
/// let opts = IngestionOptions {
///     observer: Some(Arc::new(StdErrObserver::default())),
///     alert_at_or_above: IngestionSeverity::Critical,
///     ..Default::default()
/// };
///
/// // Missing files are treated as Critical and will trigger `on_alert` at this threshold.
/// let mut store = MemoryStore::new();
/// let _err = ingest_from_path(&mut store, "does_not_exist.csv", &opts).unwrap_err();
/// ```
pub fn ingest_from_path<S: RecordStore + ?Sized>(
    store: &mut S,
    path: impl AsRef<Path>,
    options: &IngestionOptions,
) -> IngestionResult<IngestionSummary> {
    let path = path.as_ref();
    let format = match options.format {
        Some(f) => f,
        None => IngestionFormat::from_path(path).inspect_err(|e| {
            report_failure(&IngestionContext::table(path.display().to_string()), options, e)
        })?,
    };
    let ctx = IngestionContext::document(path.display().to_string(), format);

    let table = decode_from_path(path, format, options)
        .inspect_err(|e| report_failure(&ctx, options, e))?;
    ingest_table(store, &table, &ctx, options)
}

/// Decode an in-memory document (an upload body) and ingest it into `store`.
///
/// `source` names the document for logs. Format resolution order: `options.format`, the
/// extension of `source`, then Excel.
pub fn ingest_from_bytes<S: RecordStore + ?Sized>(
    store: &mut S,
    bytes: Vec<u8>,
    source: &str,
    options: &IngestionOptions,
) -> IngestionResult<IngestionSummary> {
    let format = options
        .format
        .or_else(|| IngestionFormat::from_path(Path::new(source)).ok())
        .unwrap_or(IngestionFormat::Excel);
    let ctx = IngestionContext::document(source, format);

    let table = decode_from_bytes(bytes, format, options)
        .inspect_err(|e| report_failure(&ctx, options, e))?;
    ingest_table(store, &table, &ctx, options)
}

fn report(ctx: &IngestionContext, options: &IngestionOptions, result: &IngestionResult<IngestionSummary>) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    match result {
        Ok(summary) => {
            for row in &summary.errors {
                obs.on_row_rejected(ctx, row);
            }
            obs.on_success(
                ctx,
                IngestionStats {
                    total_rows: summary.total_rows,
                    inserted: summary.inserted,
                    rejected: summary.errors.len(),
                },
            );
        }
        Err(e) => report_failure(ctx, options, e),
    }
}

fn report_failure(ctx: &IngestionContext, options: &IngestionOptions, e: &IngestionError) {
    if let Some(obs) = options.observer.as_ref() {
        let sev = IngestionSeverity::for_error(e);
        obs.on_failure(ctx, sev, e);
        if sev >= options.alert_at_or_above {
            obs.on_alert(ctx, sev, e);
        }
    }
}

fn decode_excel_path(path: &Path, sel: &ExcelSheetSelection) -> IngestionResult<RawTable> {
    #[cfg(feature = "excel")]
    {
        super::excel::decode_excel_from_path(path, sel)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (path, sel);
        Err(excel_disabled())
    }
}

fn decode_excel_bytes(bytes: Vec<u8>, sel: &ExcelSheetSelection) -> IngestionResult<RawTable> {
    #[cfg(feature = "excel")]
    {
        super::excel::decode_excel_from_bytes(bytes, sel)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (bytes, sel);
        Err(excel_disabled())
    }
}

#[cfg(not(feature = "excel"))]
fn excel_disabled() -> IngestionError {
    IngestionError::Decode {
        message: "excel ingestion not enabled (enable cargo feature 'excel')".to_string(),
    }
}
