//! JSON decoding into a [`RawTable`].
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]` (the export format reads back this way)
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Columns are the union of object keys, appended as new keys are seen. Keys absent from an
//! object decode to [`RawValue::Null`].

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{RawTable, RawValue};

/// Decode a JSON file.
pub fn decode_json_from_path(path: impl AsRef<Path>) -> IngestionResult<RawTable> {
    let text = fs::read_to_string(path)?;
    decode_json_from_str(&text)
}

/// Decode JSON bytes. Input must be UTF-8.
pub fn decode_json_from_bytes(bytes: &[u8]) -> IngestionResult<RawTable> {
    let text = std::str::from_utf8(bytes).map_err(|e| IngestionError::Decode {
        message: format!("json input is not utf-8: {e}"),
    })?;
    decode_json_from_str(text)
}

/// Decode JSON from an in-memory string.
pub fn decode_json_from_str(input: &str) -> IngestionResult<RawTable> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IngestionError::Decode {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        match v {
            Value::Array(items) => decode_values(&items),
            Value::Object(_) => decode_values(std::slice::from_ref(&v)),
            _ => Err(IngestionError::Decode {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            }),
        }
    } else {
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str::<Value>(line).map_err(|e| IngestionError::Decode {
                message: format!("invalid ndjson at line {}: {}", i + 1, e),
            })?;
            values.push(v);
        }
        decode_values(&values)
    }
}

fn decode_values(values: &[Value]) -> IngestionResult<RawTable> {
    let mut objects: Vec<&Map<String, Value>> = Vec::with_capacity(values.len());
    let mut columns: Vec<String> = Vec::new();

    for (idx0, v) in values.iter().enumerate() {
        let obj = v.as_object().ok_or_else(|| IngestionError::Decode {
            message: format!("item {} is not a json object", idx0 + 1),
        })?;
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    if columns.is_empty() {
        return Err(IngestionError::Decode {
            message: "json input has no columns".to_string(),
        });
    }

    let rows = objects
        .into_iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map_or(RawValue::Null, convert_json_value))
                .collect()
        })
        .collect();

    Ok(RawTable::new(columns, rows))
}

fn convert_json_value(v: &Value) -> RawValue {
    match v {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => RawValue::Int(i),
            None => n.as_f64().map_or(RawValue::Null, RawValue::Float),
        },
        Value::String(s) => RawValue::Text(s.clone()),
        nested => RawValue::Text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_the_union_of_keys() {
        let t = decode_json_from_str(r#"[{"a":1,"b":"x"},{"c":2.5,"a":null}]"#).unwrap();
        assert_eq!(t.columns, vec!["a", "b", "c"]);
        assert_eq!(
            t.rows[1],
            vec![RawValue::Null, RawValue::Null, RawValue::Float(2.5)]
        );
    }

    #[test]
    fn ndjson_fallback() {
        let t = decode_json_from_str("{\"a\":1}\n\n{\"a\":2}\n").unwrap();
        assert_eq!(t.row_count(), 2);
    }

    #[test]
    fn scalars_are_rejected() {
        assert!(matches!(
            decode_json_from_str("42"),
            Err(IngestionError::Decode { .. })
        ));
    }
}
