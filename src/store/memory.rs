use std::collections::HashSet;

use crate::error::{StoreError, StoreResult};
use crate::ingestion::duplicates::RecordKey;
use crate::query::RecordQuery;
use crate::types::{Record, StoredRecord};

use super::RecordStore;

/// In-memory store. Natural order is insertion (`id`) order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Vec<StoredRecord>,
    keys: HashSet<RecordKey>,
    next_id: i64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rows written by someone else (nulls allowed).
    ///
    /// Surrogate ids continue after the largest seeded id.
    pub fn with_rows(rows: Vec<StoredRecord>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0);
        let keys = rows.iter().filter_map(RecordKey::from_stored).collect();
        Self {
            rows,
            keys,
            next_id,
        }
    }

    /// All stored rows in natural order.
    pub fn rows(&self) -> &[StoredRecord] {
        &self.rows
    }
}

impl RecordStore for MemoryStore {
    fn has_exact_match(&self, record: &Record) -> StoreResult<bool> {
        Ok(self.keys.contains(&RecordKey::new(record)))
    }

    fn commit_batch(&mut self, records: &[Record]) -> StoreResult<usize> {
        let mut batch_keys = HashSet::with_capacity(records.len());
        for record in records {
            let key = RecordKey::new(record);
            if self.keys.contains(&key) || !batch_keys.insert(key) {
                return Err(StoreError::Constraint(format!(
                    "duplicate business key (record_id={}, object_id={})",
                    record.record_id, record.object_id
                )));
            }
        }

        for record in records {
            self.next_id += 1;
            self.rows
                .push(StoredRecord::from_record(self.next_id, record.clone()));
        }
        self.keys.extend(batch_keys);
        Ok(records.len())
    }

    fn query(&self, query: &RecordQuery) -> StoreResult<Vec<StoredRecord>> {
        Ok(query.apply(&self.rows))
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(record_id: i64) -> Record {
        Record {
            record_id,
            object_id: "OBJ-1".to_string(),
            work_type: "paint".to_string(),
            period: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            quantity: 4,
            unit_price: 2.5,
            total_cost: 10.0,
            contractor: "Acme".to_string(),
        }
    }

    #[test]
    fn commit_assigns_sequential_ids() {
        let mut store = MemoryStore::new();
        assert_eq!(store.commit_batch(&[record(1), record(2)]).unwrap(), 2);
        assert_eq!(store.commit_batch(&[record(3)]).unwrap(), 1);
        let ids: Vec<i64> = store.rows().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn commit_is_all_or_nothing_on_constraint_violation() {
        let mut store = MemoryStore::new();
        store.commit_batch(&[record(1)]).unwrap();

        let err = store.commit_batch(&[record(2), record(1)]).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.count().unwrap(), 1);
        assert!(!store.has_exact_match(&record(2)).unwrap());
    }

    #[test]
    fn duplicate_within_one_commit_is_rejected() {
        let mut store = MemoryStore::new();
        assert!(store.commit_batch(&[record(5), record(5)]).is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn seeded_rows_with_nulls_never_match() {
        let mut seeded = StoredRecord::from_record(10, record(1));
        seeded.total_cost = None;
        let mut store = MemoryStore::with_rows(vec![seeded]);
        assert!(!store.has_exact_match(&record(1)).unwrap());
        store.commit_batch(&[record(1)]).unwrap();
        assert_eq!(store.rows()[1].id, 11);
    }
}
