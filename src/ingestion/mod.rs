//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest_from_path`] or [`ingest_from_bytes`] (from [`unified`]) which:
//!
//! - auto-detect format by file extension (or you can override via [`IngestionOptions`])
//! - decode the document into a [`crate::types::RawTable`]
//! - run the [`pipeline`]: structural check, per-row parsing, duplicate suppression, one commit
//! - optionally report outcomes to an [`IngestionObserver`]
//!
//! The building blocks are public too:
//! - [`parsers`]: one raw cell to one typed field
//! - [`duplicates`]: exact-duplicate detection over a staged view
//! - [`csv`], [`json`] and `excel` (feature `excel`): document decoders

pub mod csv;
pub mod duplicates;
#[cfg(feature = "excel")]
pub mod excel;
pub mod json;
pub mod observability;
pub mod parsers;
pub mod pipeline;
pub mod unified;

pub use duplicates::{ExactMatch, StagedBatch, is_exact_duplicate};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    StdErrObserver,
};
pub use pipeline::{
    DUPLICATE_ROW_MESSAGE, IngestionSummary, ParseMode, RowError, ingest, ingest_with_mode, parse_row,
};
pub use unified::{
    ExcelSheetSelection, IngestionFormat, IngestionOptions, decode_from_bytes, decode_from_path,
    ingest_from_bytes, ingest_from_path, ingest_table,
};
