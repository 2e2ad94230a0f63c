//! Record storage.
//!
//! [`RecordStore`] is the seam between the pipeline/query code and a storage engine. Two engines
//! ship with the crate:
//!
//! - [`MemoryStore`]: a vector of rows, used for tests and the `memory` backend
//! - [`SqliteStore`] (feature `sqlite`): a `records` table in a SQLite file
//!
//! Both enforce uniqueness over the eight business fields at commit time, so a duplicate that
//! slips past the pipeline's check (two uploads racing) fails the later commit.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use crate::error::StoreResult;
use crate::query::RecordQuery;
use crate::types::{Record, StoredRecord};

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteJournalMode, SqliteStore, SqliteStoreConfig};

/// A transactional store of [`Record`]s.
pub trait RecordStore {
    /// Returns `true` if a committed row equals `record` on all eight business fields.
    ///
    /// Rows with a null business column never match.
    fn has_exact_match(&self, record: &Record) -> StoreResult<bool>;

    /// Persist `records` atomically: either every record is stored or none is.
    ///
    /// Returns the number of rows written.
    fn commit_batch(&mut self, records: &[Record]) -> StoreResult<usize>;

    /// Run a filtered, sorted, paginated read.
    fn query(&self, query: &RecordQuery) -> StoreResult<Vec<StoredRecord>>;

    /// Total number of stored rows.
    fn count(&self) -> StoreResult<usize>;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn has_exact_match(&self, record: &Record) -> StoreResult<bool> {
        (**self).has_exact_match(record)
    }

    fn commit_batch(&mut self, records: &[Record]) -> StoreResult<usize> {
        (**self).commit_batch(records)
    }

    fn query(&self, query: &RecordQuery) -> StoreResult<Vec<StoredRecord>> {
        (**self).query(query)
    }

    fn count(&self) -> StoreResult<usize> {
        (**self).count()
    }
}
