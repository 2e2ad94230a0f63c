//! JSON export of query results.

use serde::Serialize;

use crate::error::QueryResult;
use crate::types::StoredRecord;

/// File name offered for the export attachment.
pub const EXPORT_FILE_NAME: &str = "records_export.json";

/// One outward-facing row: the eight business fields, `period` as `YYYY-MM-DD`, no surrogate
/// `id`. Used for the export document and for `GET /records`.
///
/// Null columns serialize as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub record_id: Option<i64>,
    pub object_id: Option<String>,
    pub work_type: Option<String>,
    pub period: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub total_cost: Option<f64>,
    pub contractor: Option<String>,
}

impl From<&StoredRecord> for ExportRow {
    fn from(record: &StoredRecord) -> Self {
        Self {
            record_id: record.record_id,
            object_id: record.object_id.clone(),
            work_type: record.work_type.clone(),
            period: record.period.map(|d| d.format("%Y-%m-%d").to_string()),
            quantity: record.quantity,
            unit_price: record.unit_price.filter(|f| f.is_finite()),
            total_cost: record.total_cost.filter(|f| f.is_finite()),
            contractor: record.contractor.clone(),
        }
    }
}

impl ExportRow {
    fn null_count(&self) -> usize {
        [
            self.record_id.is_none(),
            self.object_id.is_none(),
            self.work_type.is_none(),
            self.period.is_none(),
            self.quantity.is_none(),
            self.unit_price.is_none(),
            self.total_cost.is_none(),
            self.contractor.is_none(),
        ]
        .into_iter()
        .filter(|null| *null)
        .count()
    }
}

/// A serialized export plus what it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    /// Pretty-printed UTF-8 JSON array.
    pub bytes: Vec<u8>,
    /// Number of exported rows.
    pub rows: usize,
    /// Number of null cells emitted across all rows.
    pub null_fields: usize,
}

impl ExportDocument {
    /// File name for the attachment.
    pub fn file_name(&self) -> &'static str {
        EXPORT_FILE_NAME
    }
}

/// Serialize records, in the given order, as a pretty-printed JSON array.
///
/// Non-ASCII text is written as-is. Rows with null columns are kept and the nulls counted.
pub fn export_json(records: &[StoredRecord]) -> QueryResult<ExportDocument> {
    let rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();
    let null_fields = rows.iter().map(ExportRow::null_count).sum();
    let bytes = serde_json::to_vec_pretty(&rows)?;
    Ok(ExportDocument {
        bytes,
        rows: rows.len(),
        null_fields,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn rec() -> StoredRecord {
        StoredRecord {
            id: 7,
            record_id: Some(1),
            object_id: Some("OBJ-1".to_string()),
            work_type: Some("Покраска".to_string()),
            period: NaiveDate::from_ymd_opt(2024, 3, 15),
            quantity: Some(3),
            unit_price: Some(2.5),
            total_cost: Some(7.5),
            contractor: Some("Acme".to_string()),
        }
    }

    #[test]
    fn export_keeps_non_ascii_and_iso_dates() {
        let doc = export_json(&[rec()]).unwrap();
        let text = String::from_utf8(doc.bytes).unwrap();
        assert!(text.contains("Покраска"));
        assert!(text.contains("\"period\": \"2024-03-15\""));
        assert!(!text.contains("\"id\""));
        assert_eq!(doc.rows, 1);
        assert_eq!(doc.null_fields, 0);
    }

    #[test]
    fn export_emits_null_for_missing_numeric_columns() {
        let mut r = rec();
        r.quantity = None;
        r.unit_price = None;
        r.period = None;
        let doc = export_json(&[r]).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&doc.bytes).unwrap();
        assert!(parsed[0]["quantity"].is_null());
        assert!(parsed[0]["period"].is_null());
        assert_eq!(parsed[0]["total_cost"], serde_json::json!(7.5));
        assert_eq!(doc.null_fields, 3);
    }

    #[test]
    fn empty_export_is_an_empty_array() {
        let doc = export_json(&[]).unwrap();
        assert_eq!(doc.file_name(), "records_export.json");
        assert_eq!(std::str::from_utf8(&doc.bytes).unwrap(), "[]");
    }
}
