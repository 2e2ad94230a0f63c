//! CSV decoding into a [`RawTable`].
//!
//! The first record is the header. Empty cells decode to [`RawValue::Null`]; everything else is
//! kept as untrimmed [`RawValue::Text`] for the field parsers to normalize.

use std::io::Read;
use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{RawTable, RawValue};

/// Decode a CSV file.
pub fn decode_csv_from_path(path: impl AsRef<Path>, delimiter: u8) -> IngestionResult<RawTable> {
    let mut rdr = builder(delimiter).from_path(path)?;
    decode_csv_from_reader(&mut rdr)
}

/// Decode CSV held in memory.
pub fn decode_csv_from_bytes(bytes: &[u8], delimiter: u8) -> IngestionResult<RawTable> {
    let mut rdr = builder(delimiter).from_reader(bytes);
    decode_csv_from_reader(&mut rdr)
}

/// Decode CSV data from an existing CSV reader.
pub fn decode_csv_from_reader<R: Read>(rdr: &mut csv::Reader<R>) -> IngestionResult<RawTable> {
    let headers = rdr.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestionError::Decode {
            message: "csv has no header row".to_string(),
        });
    }
    let columns: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(cell).collect());
    }

    Ok(RawTable::new(columns, rows))
}

fn builder(delimiter: u8) -> csv::ReaderBuilder {
    let mut b = csv::ReaderBuilder::new();
    b.has_headers(true).flexible(true).delimiter(delimiter);
    b
}

fn cell(raw: &str) -> RawValue {
    if raw.is_empty() {
        RawValue::Null
    } else {
        RawValue::Text(raw.to_string())
    }
}
