//! Sort specification over [`StoredRecord`] fields.

use std::cmp::Ordering;

use crate::types::StoredRecord;

use super::filter::FieldValue;

/// One of the eight business fields a query can sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    RecordId,
    ObjectId,
    WorkType,
    Period,
    Quantity,
    UnitPrice,
    TotalCost,
    Contractor,
}

impl SortField {
    /// All sortable fields in canonical order.
    pub const ALL: [SortField; 8] = [
        Self::RecordId,
        Self::ObjectId,
        Self::WorkType,
        Self::Period,
        Self::Quantity,
        Self::UnitPrice,
        Self::TotalCost,
        Self::Contractor,
    ];

    /// Resolve a field by its column name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == name)
    }

    /// Column name used in tables, query strings and SQL.
    pub fn column(self) -> &'static str {
        match self {
            Self::RecordId => "record_id",
            Self::ObjectId => "object_id",
            Self::WorkType => "work_type",
            Self::Period => "period",
            Self::Quantity => "quantity",
            Self::UnitPrice => "unit_price",
            Self::TotalCost => "total_cost",
            Self::Contractor => "contractor",
        }
    }

    /// Read this field from a stored record (`None` when the column is null).
    pub fn value_of(self, record: &StoredRecord) -> Option<FieldValue> {
        match self {
            Self::RecordId => record.record_id.map(FieldValue::Int),
            Self::ObjectId => record.object_id.clone().map(FieldValue::Text),
            Self::WorkType => record.work_type.clone().map(FieldValue::Text),
            Self::Period => record.period.map(FieldValue::Date),
            Self::Quantity => record.quantity.map(FieldValue::Int),
            Self::UnitPrice => record.unit_price.map(FieldValue::Float),
            Self::TotalCost => record.total_cost.map(FieldValue::Float),
            Self::Contractor => record.contractor.clone().map(FieldValue::Text),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse `asc` / `desc`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// SQL keyword for this direction.
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Field plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    /// Build a sort from raw parameters. Unknown or absent `sort_by` means no explicit ordering.
    pub fn from_params(sort_by: Option<&str>, order: SortOrder) -> Option<Self> {
        sort_by
            .and_then(SortField::from_name)
            .map(|field| Self { field, order })
    }

    /// Compare two records under this spec. Nulls sort first ascending and last descending.
    pub fn compare(&self, a: &StoredRecord, b: &StoredRecord) -> Ordering {
        let ord = match (self.field.value_of(a), self.field.value_of(b)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        };
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }

    /// Stable in-place sort; ties keep their incoming order.
    pub fn sort(&self, records: &mut [StoredRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}
