//! Record service: one store, one scoped handle per operation.
//!
//! Each call locks the store for its whole duration and drops the guard on return, whether the
//! operation succeeded or failed. Two uploads arriving at once therefore run one after the
//! other; the store's uniqueness constraint still rejects anything that gets past the pipeline.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{IngestionResult, QueryResult, StoreError, StoreResult};
use crate::ingestion::{
    IngestionContext, IngestionFormat, IngestionOptions, IngestionSummary, ingest_from_bytes, ingest_from_path,
    ingest_table,
};
use crate::query::{ExportDocument, RecordQuery, export_json};
use crate::store::{MemoryStore, RecordStore};
use crate::types::{RawTable, StoredRecord};

/// Type-erased store chosen at runtime from configuration.
pub type DynStore = Box<dyn RecordStore + Send>;

/// Open the store described by `config`.
pub fn open_store(config: &StoreConfig) -> StoreResult<DynStore> {
    match config.backend {
        StoreBackend::Memory => Ok(Box::new(MemoryStore::new())),
        StoreBackend::Sqlite => open_sqlite(config),
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &StoreConfig) -> StoreResult<DynStore> {
    use crate::store::{SqliteStore, SqliteStoreConfig};

    let path = config
        .path
        .clone()
        .ok_or_else(|| StoreError::Invalid("sqlite store requires path".to_string()))?;
    let sqlite = SqliteStoreConfig {
        busy_timeout_ms: config.busy_timeout_ms,
        ..SqliteStoreConfig::new(path)
    };
    Ok(Box::new(SqliteStore::open(&sqlite)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &StoreConfig) -> StoreResult<DynStore> {
    Err(StoreError::Invalid(
        "sqlite store requires the `sqlite` cargo feature".to_string(),
    ))
}

/// Serializes access to a [`RecordStore`] and applies the configured ingestion options.
#[derive(Debug)]
pub struct RecordService<S> {
    store: Mutex<S>,
    options: IngestionOptions,
}

impl<S: RecordStore> RecordService<S> {
    /// Wrap `store`.
    pub fn new(store: S, options: IngestionOptions) -> Self {
        Self {
            store: Mutex::new(store),
            options,
        }
    }

    /// Ingestion options applied to every upload.
    pub fn options(&self) -> &IngestionOptions {
        &self.options
    }

    fn handle(&self) -> StoreResult<MutexGuard<'_, S>> {
        self.store.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Ingest an already-decoded table.
    pub fn ingest_table(&self, table: &RawTable, source: &str) -> IngestionResult<IngestionSummary> {
        let mut store = self.handle()?;
        ingest_table(&mut *store, table, &IngestionContext::table(source), &self.options)
    }

    /// Decode and ingest an uploaded document.
    ///
    /// `format` overrides the configured format; otherwise it is inferred from `source`'s
    /// extension, falling back to Excel.
    pub fn ingest_bytes(
        &self,
        bytes: Vec<u8>,
        source: &str,
        format: Option<IngestionFormat>,
    ) -> IngestionResult<IngestionSummary> {
        let options = IngestionOptions {
            format: format.or(self.options.format),
            ..self.options.clone()
        };
        let mut store = self.handle()?;
        ingest_from_bytes(&mut *store, bytes, source, &options)
    }

    /// Decode and ingest a document on disk.
    pub fn ingest_path(
        &self,
        path: impl AsRef<Path>,
        format: Option<IngestionFormat>,
    ) -> IngestionResult<IngestionSummary> {
        let options = IngestionOptions {
            format: format.or(self.options.format),
            ..self.options.clone()
        };
        let mut store = self.handle()?;
        ingest_from_path(&mut *store, path, &options)
    }

    /// Filtered, sorted, paginated read.
    pub fn list(&self, query: &RecordQuery) -> QueryResult<Vec<StoredRecord>> {
        let store = self.handle()?;
        Ok(store.query(query)?)
    }

    /// Same rows as [`Self::list`], serialized as the export document.
    pub fn export(&self, query: &RecordQuery) -> QueryResult<ExportDocument> {
        let rows = self.list(query)?;
        let doc = export_json(&rows)?;
        if doc.null_fields > 0 {
            eprintln!(
                "[export][warn] rows={} null_fields={} (exported as null)",
                doc.rows, doc.null_fields
            );
        }
        Ok(doc)
    }

    /// Total number of stored rows.
    pub fn count(&self) -> StoreResult<usize> {
        self.handle()?.count()
    }

    /// Consume the service and return the store.
    pub fn into_inner(self) -> StoreResult<S> {
        self.store.into_inner().map_err(|_| StoreError::Poisoned)
    }
}
