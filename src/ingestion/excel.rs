#![cfg(feature = "excel")]

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto, open_workbook_auto_from_rs};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{RawTable, RawValue};

use super::unified::ExcelSheetSelection;

/// Decode a workbook (`.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`) from disk into a [`RawTable`].
///
/// Behavior:
/// - Picks sheet(s) according to `selection`; the default is the first sheet
/// - Detects the first non-empty row as the header row
/// - Converts remaining rows into [`RawValue`]s; blank rows are dropped and the rest keep their
///   sheet row numbers for error reporting
pub fn decode_excel_from_path(
    path: impl AsRef<Path>,
    selection: &ExcelSheetSelection,
) -> IngestionResult<RawTable> {
    let mut workbook = open_workbook_auto(path)?;
    decode_workbook(&mut workbook, selection)
}

/// Decode a workbook held in memory, e.g. an uploaded request body.
pub fn decode_excel_from_bytes(
    bytes: Vec<u8>,
    selection: &ExcelSheetSelection,
) -> IngestionResult<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    decode_workbook(&mut workbook, selection)
}

fn decode_workbook<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    selection: &ExcelSheetSelection,
) -> IngestionResult<RawTable> {
    let all = workbook.sheet_names().to_vec();
    let sheets: Vec<String> = match selection {
        ExcelSheetSelection::First => all.into_iter().take(1).collect(),
        ExcelSheetSelection::Sheet(name) => vec![name.clone()],
        ExcelSheetSelection::AllSheets => all,
        ExcelSheetSelection::Sheets(names) => names.clone(),
    };
    if sheets.is_empty() {
        return Err(IngestionError::Decode {
            message: "workbook has no sheets".to_string(),
        });
    }

    let mut table: Option<RawTable> = None;
    for sheet in sheets {
        let range = workbook.worksheet_range(&sheet)?;
        let decoded = decode_sheet_range(&range).map_err(|e| with_sheet(&sheet, e))?;
        match table.as_mut() {
            None => table = Some(decoded),
            Some(acc) => {
                if acc.columns != decoded.columns {
                    return Err(IngestionError::Decode {
                        message: format!(
                            "sheet '{sheet}': header {:?} differs from first sheet {:?}",
                            decoded.columns, acc.columns
                        ),
                    });
                }
                acc.append(decoded);
            }
        }
    }

    table.ok_or_else(|| IngestionError::Decode {
        message: "workbook has no sheets".to_string(),
    })
}

fn with_sheet(sheet: &str, err: IngestionError) -> IngestionError {
    match err {
        IngestionError::Decode { message } => IngestionError::Decode {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn decode_sheet_range(range: &Range<Data>) -> IngestionResult<RawTable> {
    // 1-based sheet row of the range's first row.
    let first_row = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut rows = range
        .rows()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|c| !matches!(c, Data::Empty)));
    let (_, header) = rows.next().ok_or_else(|| IngestionError::Decode {
        message: "sheet has no non-empty rows (no header row found)".to_string(),
    })?;
    let columns: Vec<String> = header.iter().map(cell_to_header_string).collect();

    let mut out = Vec::new();
    let mut source_rows = Vec::new();
    for (offset, row) in rows {
        let cells: Vec<RawValue> = row.iter().map(convert_cell).collect();
        if cells.iter().all(|c| *c == RawValue::Null) {
            continue;
        }
        out.push(cells);
        source_rows.push(first_row + offset);
    }

    Ok(RawTable::new(columns, out).with_source_rows(source_rows))
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(c: &Data) -> RawValue {
    match c {
        Data::Empty | Data::Error(_) => RawValue::Null,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Int(i) => RawValue::Int(*i),
        Data::Float(f) => RawValue::Float(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(dt) => RawValue::DateSerial(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
    }
}
