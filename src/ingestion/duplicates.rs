//! Exact-duplicate detection.
//!
//! Two records are exact duplicates when all eight business fields are equal. The surrogate `id`
//! is not part of the comparison. During ingestion the check runs against a [`StagedBatch`],
//! which sees committed rows and the rows accepted earlier in the same batch.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::StoreResult;
use crate::store::RecordStore;
use crate::types::{Record, StoredRecord};

/// Anything that can answer "does an exact copy of this record exist?".
pub trait ExactMatch {
    /// Returns `true` if an exact duplicate of `record` is visible.
    fn contains_exact(&self, record: &Record) -> StoreResult<bool>;
}

impl<S: RecordStore + ?Sized> ExactMatch for S {
    fn contains_exact(&self, record: &Record) -> StoreResult<bool> {
        self.has_exact_match(record)
    }
}

/// Returns `true` iff `view` holds a record equal to `candidate` on every business field.
pub fn is_exact_duplicate<V: ExactMatch + ?Sized>(view: &V, candidate: &Record) -> StoreResult<bool> {
    view.contains_exact(candidate)
}

/// Hashable identity of a record's eight business fields.
///
/// Floats are keyed by bit pattern with `-0.0` folded into `0.0`, which agrees with `==` for
/// every value the parsers can produce (they never yield NaN).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RecordKey {
    record_id: i64,
    object_id: String,
    work_type: String,
    period: NaiveDate,
    quantity: i64,
    unit_price: u64,
    total_cost: u64,
    contractor: String,
}

fn float_key(f: f64) -> u64 {
    if f == 0.0 { 0.0f64.to_bits() } else { f.to_bits() }
}

impl RecordKey {
    pub(crate) fn new(record: &Record) -> Self {
        Self {
            record_id: record.record_id,
            object_id: record.object_id.clone(),
            work_type: record.work_type.clone(),
            period: record.period,
            quantity: record.quantity,
            unit_price: float_key(record.unit_price),
            total_cost: float_key(record.total_cost),
            contractor: record.contractor.clone(),
        }
    }

    /// Key of a stored row, or `None` if any business column is null (such rows never match).
    pub(crate) fn from_stored(row: &StoredRecord) -> Option<Self> {
        Some(Self {
            record_id: row.record_id?,
            object_id: row.object_id.clone()?,
            work_type: row.work_type.clone()?,
            period: row.period?,
            quantity: row.quantity?,
            unit_price: float_key(row.unit_price?),
            total_cost: float_key(row.total_cost?),
            contractor: row.contractor.clone()?,
        })
    }
}

/// Rows accepted in the current ingestion run, layered over the store's committed state.
#[derive(Debug)]
pub struct StagedBatch<'s, S: ?Sized> {
    store: &'s S,
    staged: Vec<Record>,
    keys: HashSet<RecordKey>,
}

impl<'s, S: RecordStore + ?Sized> StagedBatch<'s, S> {
    /// Start an empty batch over `store`.
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            staged: Vec::new(),
            keys: HashSet::new(),
        }
    }

    /// Hold `record` for the batch commit. Later checks in this batch will see it.
    pub fn stage(&mut self, record: Record) {
        self.keys.insert(RecordKey::new(&record));
        self.staged.push(record);
    }

    /// Number of staged records.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Returns `true` if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Release the store borrow and hand back the staged records in staging order.
    pub fn into_records(self) -> Vec<Record> {
        self.staged
    }
}

impl<S: RecordStore + ?Sized> ExactMatch for StagedBatch<'_, S> {
    fn contains_exact(&self, record: &Record) -> StoreResult<bool> {
        if self.keys.contains(&RecordKey::new(record)) {
            return Ok(true);
        }
        self.store.has_exact_match(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(total_cost: f64) -> Record {
        Record {
            record_id: 1,
            object_id: "OBJ_1".to_string(),
            work_type: "paint".to_string(),
            period: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            quantity: 2,
            unit_price: 0.5,
            total_cost,
            contractor: "Acme".to_string(),
        }
    }

    #[test]
    fn staged_rows_are_visible_to_later_checks() {
        let store = MemoryStore::new();
        let mut batch = StagedBatch::new(&store);
        assert!(!is_exact_duplicate(&batch, &record(1.0)).unwrap());
        batch.stage(record(1.0));
        assert!(is_exact_duplicate(&batch, &record(1.0)).unwrap());
        assert!(!is_exact_duplicate(&batch, &record(1.5)).unwrap());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn committed_rows_are_visible_through_the_batch() {
        let mut store = MemoryStore::new();
        store.commit_batch(&[record(3.0)]).unwrap();
        let batch = StagedBatch::new(&store);
        assert!(is_exact_duplicate(&batch, &record(3.0)).unwrap());
        assert!(is_exact_duplicate(&store, &record(3.0)).unwrap());
    }

    #[test]
    fn signed_zero_is_one_key() {
        assert_eq!(RecordKey::new(&record(0.0)), RecordKey::new(&record(-0.0)));
    }
}
