//! Read-side query composition.
//!
//! A [`RecordQuery`] is three independent parts:
//!
//! - [`RecordFilter`]: twelve optional, AND-combined filters
//! - [`SortSpec`]: optional field + direction (absent means the store's natural `id` order)
//! - [`Page`]: `limit` clamped to `1..=1000`, `offset` skip count
//!
//! [`QueryParams`] is the flat, serde-friendly shape request layers bind query strings into.
//!
//! ## Example
//!
//! ```rust
//! use work_records::query::{QueryParams, MAX_LIMIT};
//!
//! let params = QueryParams {
//!     quantity_min: Some(10.0),
//!     quantity_max: Some(20.0),
//!     sort_by: Some("period".to_string()),
//!     sort_order: Some("desc".to_string()),
//!     limit: Some(5_000),
//!     ..Default::default()
//! };
//! let query = params.into_query().unwrap();
//! assert_eq!(query.page.limit, MAX_LIMIT);
//! assert_eq!(query.filter.predicates().len(), 2);
//! ```

pub mod export;
pub mod filter;
pub mod sort;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{QueryError, QueryResult};
use crate::types::StoredRecord;

pub use export::{export_json, ExportDocument, ExportRow, EXPORT_FILE_NAME};
pub use filter::{CmpOp, FieldValue, Predicate, RecordFilter};
pub use sort::{SortField, SortOrder, SortSpec};

/// Page size used when the caller does not give one.
pub const DEFAULT_LIMIT: usize = 50;
/// Hard cap on page size.
pub const MAX_LIMIT: usize = 1000;

/// Pagination bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// Build a page, clamping `limit` into `1..=MAX_LIMIT`.
    pub fn new(limit: i64, offset: u64) -> Self {
        let limit = usize::try_from(limit.max(1)).unwrap_or(MAX_LIMIT).min(MAX_LIMIT);
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Fully composed read query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub filter: RecordFilter,
    pub sort: Option<SortSpec>,
    pub page: Page,
}

impl RecordQuery {
    /// Evaluate against records given in natural order: filter, then stable sort, then page.
    pub fn apply<'a, I>(&self, records: I) -> Vec<StoredRecord>
    where
        I: IntoIterator<Item = &'a StoredRecord>,
    {
        let predicates = self.filter.predicates();
        let mut matched: Vec<StoredRecord> = records
            .into_iter()
            .filter(|r| predicates.iter().all(|p| p.matches(r)))
            .cloned()
            .collect();
        if let Some(sort) = &self.sort {
            sort.sort(&mut matched);
        }
        matched
            .into_iter()
            .skip(self.page.offset)
            .take(self.page.limit)
            .collect()
    }
}

/// Query-string shaped parameters, as bound by a request layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub record_id: Option<i64>,
    pub object_id: Option<String>,
    pub work_type: Option<String>,
    pub contractor: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub quantity_min: Option<f64>,
    pub quantity_max: Option<f64>,
    pub unit_price_min: Option<f64>,
    pub unit_price_max: Option<f64>,
    pub total_cost_min: Option<f64>,
    pub total_cost_max: Option<f64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

impl QueryParams {
    /// Compose the query. Fails only on a `sort_order` other than `asc`/`desc`.
    pub fn into_query(self) -> QueryResult<RecordQuery> {
        let order = match self.sort_order.as_deref() {
            None | Some("") => SortOrder::Asc,
            Some(raw) => SortOrder::from_name(raw)
                .ok_or_else(|| QueryError::InvalidSortOrder(raw.to_string()))?,
        };
        let sort = SortSpec::from_params(self.sort_by.as_deref(), order);
        let default_limit = i64::try_from(DEFAULT_LIMIT).unwrap_or(i64::MAX);
        let page = Page::new(self.limit.unwrap_or(default_limit), self.offset.unwrap_or(0));

        Ok(RecordQuery {
            filter: RecordFilter {
                record_id: self.record_id,
                object_id: self.object_id,
                work_type: self.work_type,
                contractor: self.contractor,
                date_from: self.date_from,
                date_to: self.date_to,
                quantity_min: self.quantity_min,
                quantity_max: self.quantity_max,
                unit_price_min: self.unit_price_min,
                unit_price_max: self.unit_price_max,
                total_cost_min: self.total_cost_min,
                total_cost_max: self.total_cost_max,
            },
            sort,
            page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped_into_range() {
        assert_eq!(Page::new(5_000, 0).limit, MAX_LIMIT);
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(-7, 0).limit, 1);
        assert_eq!(Page::new(25, 3), Page { limit: 25, offset: 3 });
    }

    #[test]
    fn defaults_apply_when_params_absent() {
        let q = QueryParams::default().into_query().unwrap();
        assert_eq!(q.page, Page::default());
        assert_eq!(q.sort, None);
        assert!(q.filter.is_empty());
    }

    #[test]
    fn bad_sort_order_is_rejected() {
        let err = QueryParams {
            sort_order: Some("sideways".to_string()),
            ..Default::default()
        }
        .into_query()
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidSortOrder(ref s) if s == "sideways"));
    }
}
