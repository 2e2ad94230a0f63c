//! `work-records` ingests spreadsheet-originated work-item records (object, work type, period,
//! quantity, pricing, contractor) into a store, and serves them back through a filterable,
//! sortable, paginated query interface with a JSON export.
//!
//! The primary entrypoints are [`ingestion::ingest_from_path`] and
//! [`ingestion::ingest_from_bytes`], which decode a document and run the ingestion pipeline
//! against a [`store::RecordStore`].
//!
//! ## What you can ingest
//!
//! **File formats (auto-detected by extension):**
//!
//! - **Excel/workbooks** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//! - **CSV**: `.csv`
//! - **JSON**: `.json` (array-of-objects, e.g. a previous export) and `.ndjson`
//!
//! **Required columns** (extra columns are ignored):
//!
//! `record_id, object_id, work_type, period, quantity, unit_price, total_cost, contractor`
//!
//! ## Pipeline semantics
//!
//! - A missing required column fails the whole upload; nothing is written.
//! - A row with a bad field, or an exact duplicate of a stored or earlier row, is skipped and
//!   reported as `{row, error}` (the first data row is row 2).
//! - Every accepted row is committed in one transaction. A commit failure rolls everything back.
//!
//! Numbers tolerate locale formatting (`"1 234,56"` is `1234.56`); dates accept day-first,
//! ISO, textual-month and spreadsheet-serial forms.
//!
//! ## Quick example: ingest then query
//!
//! ```rust
//! use work_records::ingestion::ingest;
//! use work_records::query::QueryParams;
//! use work_records::store::{MemoryStore, RecordStore};
//! use work_records::types::{RawTable, RawValue, REQUIRED_COLUMNS};
//!
//! let columns = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
//! let rows = vec![
//!     ["1", "OBJ-1", "paint", "31.01.2024", "12", "2,5", "30", "Acme"],
//!     ["2", "OBJ-2", "plaster", "2024-02-15", "25", "4", "100", "Acme"],
//! ]
//! .into_iter()
//! .map(|r| r.iter().map(|s| RawValue::Text(s.to_string())).collect())
//! .collect();
//! let table = RawTable::new(columns, rows);
//!
//! let mut store = MemoryStore::new();
//! let summary = ingest(&mut store, &table, &REQUIRED_COLUMNS).unwrap();
//! assert_eq!(summary.inserted, 2);
//!
//! let query = QueryParams {
//!     quantity_min: Some(10.0),
//!     quantity_max: Some(20.0),
//!     ..Default::default()
//! }
//! .into_query()
//! .unwrap();
//! let hits = store.query(&query).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].object_id.as_deref(), Some("OBJ-1"));
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: field parsers, duplicate detection, the pipeline, decoders, observers
//! - [`store`]: the [`store::RecordStore`] seam, in-memory and SQLite (feature `sqlite`) engines
//! - [`query`]: filters, sorting, pagination and export
//! - [`service`]: one scoped store handle per operation
//! - [`config`]: TOML configuration
//! - `http` (feature `http`): axum routes for upload, query and export
//! - [`types`]: raw tables and records
//! - [`error`]: error types

pub mod config;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod ingestion;
pub mod query;
pub mod service;
pub mod store;
pub mod types;

pub use error::{IngestionError, IngestionResult};
