//! Filter predicates over [`StoredRecord`]s.
//!
//! A [`RecordFilter`] carries the twelve optional query filters. It lowers into a list of
//! [`Predicate`]s that every store evaluates the same way: the in-memory store with
//! [`Predicate::matches`], the SQLite store by compiling them into a `WHERE` clause.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::types::StoredRecord;

use super::sort::SortField;

/// A comparable scalar taken from a record or a filter parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Comparison operator of a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ge,
    Le,
}

impl CmpOp {
    /// SQL operator text.
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

/// `field <op> value`. A null field never satisfies a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: SortField,
    pub op: CmpOp,
    pub value: FieldValue,
}

impl Predicate {
    /// Evaluate against one stored record.
    pub fn matches(&self, record: &StoredRecord) -> bool {
        let Some(actual) = self.field.value_of(record) else {
            return false;
        };
        match (self.op, actual.partial_cmp(&self.value)) {
            (CmpOp::Eq, Some(Ordering::Equal)) => true,
            (CmpOp::Ge, Some(Ordering::Greater | Ordering::Equal)) => true,
            (CmpOp::Le, Some(Ordering::Less | Ordering::Equal)) => true,
            _ => false,
        }
    }
}

/// The twelve optional filters. Absent filters impose no constraint; present ones are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
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
}

impl RecordFilter {
    /// Lower the supplied filters into predicates, in parameter order.
    ///
    /// Empty strings for the text filters are treated as absent.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        let mut push = |field: SortField, op: CmpOp, value: Option<FieldValue>| {
            if let Some(value) = value {
                out.push(Predicate { field, op, value });
            }
        };
        let text = |v: &Option<String>| {
            v.as_ref()
                .filter(|s| !s.is_empty())
                .map(|s| FieldValue::Text(s.clone()))
        };

        push(SortField::RecordId, CmpOp::Eq, self.record_id.map(FieldValue::Int));
        push(SortField::ObjectId, CmpOp::Eq, text(&self.object_id));
        push(SortField::WorkType, CmpOp::Eq, text(&self.work_type));
        push(SortField::Contractor, CmpOp::Eq, text(&self.contractor));
        push(SortField::Period, CmpOp::Ge, self.date_from.map(FieldValue::Date));
        push(SortField::Period, CmpOp::Le, self.date_to.map(FieldValue::Date));
        push(SortField::Quantity, CmpOp::Ge, self.quantity_min.map(FieldValue::Float));
        push(SortField::Quantity, CmpOp::Le, self.quantity_max.map(FieldValue::Float));
        push(SortField::UnitPrice, CmpOp::Ge, self.unit_price_min.map(FieldValue::Float));
        push(SortField::UnitPrice, CmpOp::Le, self.unit_price_max.map(FieldValue::Float));
        push(SortField::TotalCost, CmpOp::Ge, self.total_cost_min.map(FieldValue::Float));
        push(SortField::TotalCost, CmpOp::Le, self.total_cost_max.map(FieldValue::Float));
        out
    }

    /// Returns `true` if no filter is supplied.
    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    /// Returns `true` if `record` satisfies every supplied filter.
    pub fn matches(&self, record: &StoredRecord) -> bool {
        self.predicates().iter().all(|p| p.matches(record))
    }
}
