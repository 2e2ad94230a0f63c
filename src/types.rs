//! Core data model types.
//!
//! Decoders produce a [`RawTable`]: ordered column names plus rows of untyped [`RawValue`] cells.
//! The ingestion pipeline turns each row into a typed [`Record`]; the store hands records back as
//! [`StoredRecord`]s carrying their surrogate key.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Column names every uploaded table must provide, in canonical field order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "record_id",
    "object_id",
    "work_type",
    "period",
    "quantity",
    "unit_price",
    "total_cost",
    "contractor",
];

/// A single raw cell value as it came out of the source document.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Missing/empty cell.
    Null,
    /// 64-bit signed integer cell.
    Int(i64),
    /// 64-bit float cell.
    Float(f64),
    /// Boolean cell.
    Bool(bool),
    /// Text cell (untrimmed).
    Text(String),
    /// Spreadsheet date/time cell, as a serial day number (1900 date system).
    DateSerial(f64),
}

impl RawValue {
    /// Returns `true` for the missing sentinel: an empty cell or a NaN float.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(f) | Self::DateSerial(f) => f.is_nan(),
            _ => false,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) | Self::DateSerial(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Source row number of the first data row when rows are numbered by position (the header
/// occupies row 1).
pub const FIRST_DATA_ROW: usize = 2;

/// In-memory decoded table.
///
/// Rows are stored as `Vec<Vec<RawValue>>` aligned with [`RawTable::columns`]. Rows shorter than
/// the header read as [`RawValue::Null`] in the missing positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    /// Header names in source order.
    pub columns: Vec<String>,
    /// Row-major cell storage.
    pub rows: Vec<Vec<RawValue>>,
    source_rows: Vec<usize>,
}

impl RawTable {
    /// Create a table from header names and rows. Row `i` is source row `i + 2`.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self {
            columns,
            rows,
            source_rows: Vec::new(),
        }
    }

    /// Attach explicit source row numbers, one per row, for decoders that skip source lines.
    pub fn with_source_rows(mut self, source_rows: Vec<usize>) -> Self {
        self.source_rows = source_rows;
        self
    }

    /// Source row number of row `idx`, as reported in row errors.
    pub fn source_row(&self, idx: usize) -> usize {
        self.source_rows
            .get(idx)
            .copied()
            .unwrap_or(idx + FIRST_DATA_ROW)
    }

    /// Append another table's rows, keeping their source row numbers.
    pub(crate) fn append(&mut self, other: RawTable) {
        let offset = self.rows.len();
        let numbered = (0..offset).map(|idx| self.source_row(idx)).collect::<Vec<_>>();
        let appended = (0..other.rows.len()).map(|idx| other.source_row(idx));
        self.source_rows = numbered.into_iter().chain(appended).collect();
        self.rows.extend(other.rows);
    }

    /// Number of data rows (the header is not counted).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the index of a column by name, if present. The first match wins.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the subset of `required` that is not present in the header, in `required` order.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.index_of(name).is_none())
            .collect()
    }

    /// Iterate rows as name-addressable views.
    pub fn iter_rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(move |cells| RawRow::new(self, cells))
    }
}

/// Borrowed view of one row that resolves cells by column name.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    table: &'a RawTable,
    cells: &'a [RawValue],
}

static NULL_CELL: RawValue = RawValue::Null;

impl<'a> RawRow<'a> {
    pub(crate) fn new(table: &'a RawTable, cells: &'a [RawValue]) -> Self {
        Self { table, cells }
    }

    /// Returns the cell under `column`, or [`RawValue::Null`] when the column or cell is absent.
    pub fn get(&self, column: &str) -> &'a RawValue {
        self.table
            .index_of(column)
            .and_then(|idx| self.cells.get(idx))
            .unwrap_or(&NULL_CELL)
    }
}

/// One validated work-item record: the eight business fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Business identifier (not unique).
    pub record_id: i64,
    /// Object identifier, `^[A-Za-z0-9_-]{3,50}$`.
    pub object_id: String,
    /// Kind of work performed.
    pub work_type: String,
    /// Billing period.
    pub period: NaiveDate,
    /// Quantity of work units.
    pub quantity: i64,
    /// Price per unit.
    pub unit_price: f64,
    /// Total cost of the line.
    pub total_cost: f64,
    /// Contractor name.
    pub contractor: String,
}

/// A record as read back from the store.
///
/// Business columns are nullable at the storage level, since other writers may have populated
/// the table; records written by this crate never contain nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Storage-assigned surrogate key.
    pub id: i64,
    pub record_id: Option<i64>,
    pub object_id: Option<String>,
    pub work_type: Option<String>,
    pub period: Option<NaiveDate>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub total_cost: Option<f64>,
    pub contractor: Option<String>,
}

impl StoredRecord {
    /// Wrap a fully-populated record with its surrogate key.
    pub fn from_record(id: i64, record: Record) -> Self {
        Self {
            id,
            record_id: Some(record.record_id),
            object_id: Some(record.object_id),
            work_type: Some(record.work_type),
            period: Some(record.period),
            quantity: Some(record.quantity),
            unit_price: Some(record.unit_price),
            total_cost: Some(record.total_cost),
            contractor: Some(record.contractor),
        }
    }
}
