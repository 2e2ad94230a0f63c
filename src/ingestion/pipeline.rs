//! Ingestion pipeline: structural check, per-row parsing, duplicate suppression, one commit.
//!
//! Row-level problems (a bad field, an exact duplicate) are collected into
//! [`IngestionSummary::errors`] and the row is skipped. Structural and storage problems abort the
//! whole batch with an [`IngestionError`] and nothing is written.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};
use crate::store::RecordStore;
use crate::types::{RawRow, RawTable, Record};

use super::duplicates::{StagedBatch, is_exact_duplicate};
use super::parsers::{FieldResult, parse_date, parse_float, parse_int, parse_object_id, parse_str};

/// Message recorded for a row that exactly matches a committed or already-staged record.
pub const DUPLICATE_ROW_MESSAGE: &str = "exact duplicate already exists";

/// One rejected row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// Source row number (the first data row is row 2 unless the decoder skipped lines).
    pub row: usize,
    /// Field validation message, or [`DUPLICATE_ROW_MESSAGE`].
    pub error: String,
}

impl RowError {
    fn duplicate(row: usize) -> Self {
        Self {
            row,
            error: DUPLICATE_ROW_MESSAGE.to_string(),
        }
    }

    /// Returns `true` if the row was skipped as an exact duplicate.
    pub fn is_duplicate(&self) -> bool {
        self.error == DUPLICATE_ROW_MESSAGE
    }
}

/// Outcome of a committed ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngestionSummary {
    /// Rows committed.
    pub inserted: usize,
    /// Rejected rows, in table order.
    pub errors: Vec<RowError>,
    /// Data rows in the source table.
    pub total_rows: usize,
}

/// How field parsing is scheduled. Output is identical either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Parse rows one after another on the calling thread.
    #[default]
    Sequential,
    /// Parse rows on the rayon pool; results are gathered back in table order.
    Parallel,
}

/// Parse the eight business fields of one row, in schema order.
///
/// The first failing field decides the error.
pub fn parse_row(row: RawRow<'_>) -> FieldResult<Record> {
    Ok(Record {
        record_id: parse_int(row.get("record_id"), "record_id")?,
        object_id: parse_object_id(row.get("object_id"), "object_id")?,
        work_type: parse_str(row.get("work_type"), "work_type")?,
        period: parse_date(row.get("period"), "period")?,
        quantity: parse_int(row.get("quantity"), "quantity")?,
        unit_price: parse_float(row.get("unit_price"), "unit_price")?,
        total_cost: parse_float(row.get("total_cost"), "total_cost")?,
        contractor: parse_str(row.get("contractor"), "contractor")?,
    })
}

/// Ingest `table` into `store`, parsing rows sequentially.
///
/// ```
/// use work_records::ingestion::ingest;
/// use work_records::store::{MemoryStore, RecordStore};
/// use work_records::types::{RawTable, RawValue, REQUIRED_COLUMNS};
///
/// let columns = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
/// let row = ["1", "OBJ-1", "paint", "31.01.2024", "4", "2,5", "10", "Acme"]
///     .iter()
///     .map(|s| RawValue::Text(s.to_string()))
///     .collect();
/// let table = RawTable::new(columns, vec![row]);
///
/// let mut store = MemoryStore::new();
/// let summary = ingest(&mut store, &table, &REQUIRED_COLUMNS).unwrap();
/// assert_eq!(summary.inserted, 1);
/// assert_eq!(store.count().unwrap(), 1);
/// ```
pub fn ingest<S: RecordStore + ?Sized>(
    store: &mut S,
    table: &RawTable,
    required_columns: &[&str],
) -> IngestionResult<IngestionSummary> {
    ingest_with_mode(store, table, required_columns, ParseMode::Sequential)
}

/// Ingest `table` into `store` with an explicit [`ParseMode`].
pub fn ingest_with_mode<S: RecordStore + ?Sized>(
    store: &mut S,
    table: &RawTable,
    required_columns: &[&str],
    mode: ParseMode,
) -> IngestionResult<IngestionSummary> {
    let missing = table.missing_columns(required_columns);
    if !missing.is_empty() {
        return Err(IngestionError::MissingColumns {
            columns: missing.into_iter().map(str::to_string).collect(),
        });
    }

    let parsed: Vec<FieldResult<Record>> = match mode {
        ParseMode::Sequential => table.iter_rows().map(parse_row).collect(),
        ParseMode::Parallel => table
            .rows
            .par_iter()
            .map(|cells| parse_row(RawRow::new(table, cells)))
            .collect(),
    };

    let mut errors = Vec::new();
    let records = {
        let mut batch = StagedBatch::new(&*store);
        for (idx, result) in parsed.into_iter().enumerate() {
            let row = table.source_row(idx);
            match result {
                Err(e) => errors.push(RowError { row, error: e.message }),
                Ok(record) => {
                    if is_exact_duplicate(&batch, &record)? {
                        errors.push(RowError::duplicate(row));
                    } else {
                        batch.stage(record);
                    }
                }
            }
        }
        batch.into_records()
    };

    if !records.is_empty() {
        store
            .commit_batch(&records)
            .map_err(IngestionError::Commit)?;
    }

    Ok(IngestionSummary {
        inserted: records.len(),
        errors,
        total_rows: table.row_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{REQUIRED_COLUMNS, RawValue};

    fn text_row(cells: [&str; 8]) -> Vec<RawValue> {
        cells
            .iter()
            .map(|s| {
                if s.is_empty() {
                    RawValue::Null
                } else {
                    RawValue::Text(s.to_string())
                }
            })
            .collect()
    }

    fn table(rows: Vec<Vec<RawValue>>) -> RawTable {
        RawTable::new(REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
    }

    const GOOD: [&str; 8] = ["7", "OBJ-7", "paint", "2024-03-01", "3", "1,5", "4.5", "Acme"];

    #[test]
    fn first_failing_field_in_schema_order_wins() {
        let t = table(vec![text_row(["x", "!", "", "bad", "", "", "", ""])]);
        let err = parse_row(t.iter_rows().next().unwrap()).unwrap_err();
        assert_eq!(err.field, "record_id");
    }

    #[test]
    fn row_numbers_start_after_the_header() {
        let mut bad = GOOD;
        bad[4] = "many";
        let t = table(vec![text_row(GOOD), text_row(bad)]);
        let mut store = MemoryStore::new();
        let summary = ingest(&mut store, &t, &REQUIRED_COLUMNS).unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].row, 3);
        assert!(summary.errors[0].error.contains("quantity"));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let mut bad = GOOD;
        bad[3] = "someday";
        let rows = vec![text_row(GOOD), text_row(bad), text_row(GOOD)];
        let t = table(rows);

        let mut a = MemoryStore::new();
        let mut b = MemoryStore::new();
        let seq = ingest_with_mode(&mut a, &t, &REQUIRED_COLUMNS, ParseMode::Sequential).unwrap();
        let par = ingest_with_mode(&mut b, &t, &REQUIRED_COLUMNS, ParseMode::Parallel).unwrap();
        assert_eq!(seq, par);
        assert_eq!(a.rows(), b.rows());
        assert!(seq.errors[1].is_duplicate());
    }

    #[test]
    fn empty_table_commits_nothing() {
        let mut store = MemoryStore::new();
        let summary = ingest(&mut store, &table(Vec::new()), &REQUIRED_COLUMNS).unwrap();
        assert_eq!(summary, IngestionSummary::default());
    }
}
