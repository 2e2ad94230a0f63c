use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience result type for query and export operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error type returned by ingestion functions.
///
/// Only batch-level failures show up here. Per-row problems (bad fields, duplicates) are
/// collected into [`crate::ingestion::IngestionSummary::errors`] instead.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source could not be turned into a table (no header row, unknown format, ...).
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Structural error: required columns are absent. Nothing was processed.
    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// The store failed while rows were being checked. Nothing was committed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The batch commit failed and was rolled back.
    #[error("commit failed, batch rolled back: {0}")]
    Commit(StoreError),
}

impl IngestionError {
    /// Returns `true` for the missing-columns error.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::MissingColumns { .. })
    }

    /// Returns `true` when the storage layer failed (row-loop lookup or commit).
    pub fn is_fatal_storage(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Commit(_))
    }
}

/// A single field of a single row failed validation.
///
/// Failures are distinguished by message text only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldValidationError {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable message naming the field and the raw value.
    pub message: String,
}

impl FieldValidationError {
    pub(crate) fn new(field: &str, message: String) -> Self {
        Self {
            field: field.to_string(),
            message,
        }
    }

    pub(crate) fn empty(field: &str) -> Self {
        Self::new(field, format!("field '{field}' is empty"))
    }
}

/// Storage engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Engine-level failure.
    #[error("store db error: {0}")]
    Db(String),
    /// A uniqueness (or other) constraint rejected the write.
    #[error("store constraint violation: {0}")]
    Constraint(String),
    /// Filesystem failure around the store.
    #[error("store io error: {0}")]
    Io(String),
    /// Invalid stored data or configuration.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// The store handle's lock was poisoned by a panicking holder.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors from composing or running a read query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// `sort_order` was something other than `asc` or `desc`.
    #[error("invalid sort_order '{0}' (expected 'asc' or 'desc')")]
    InvalidSortOrder(String),
    /// The store failed while executing the query.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The export document could not be serialized.
    #[error("export serialization failed: {0}")]
    Export(#[from] serde_json::Error),
}

/// Errors from loading service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid TOML for [`crate::config::ServiceConfig`].
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Config parsed but failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that stop the HTTP server from starting or keep it from running.
#[cfg(feature = "http")]
#[derive(Debug, Error)]
pub enum ServeError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The store could not be opened.
    #[error("store open failed: {0}")]
    Store(#[from] StoreError),
    /// Binding or serving the socket failed.
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}
