//! Cell-level parsers.
//!
//! Each parser takes one [`RawValue`] and the field name it belongs to, and returns a typed value
//! or a [`FieldValidationError`] whose message names the field and the offending raw value.
//! Parsers are pure and never touch the store.

use std::sync::LazyLock;

use chrono::{DateTime, Days, NaiveDate};
use regex::Regex;

use crate::error::FieldValidationError;
use crate::types::RawValue;

/// Convenience result type for field parsers.
pub type FieldResult<T> = Result<T, FieldValidationError>;

/// Spreadsheet serial day 0 in the 1900 date system (accounts for the 1900 leap-year bug).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// Largest serial a spreadsheet accepts (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

const QUOTE_CHARS: [char; 6] = ['"', '«', '»', '“', '”', '„'];

static OBJECT_ID_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,50}$"));

/// Fails on the missing sentinel (empty cell, NaN) and on blank text; passes anything else through.
pub fn require_value<'a>(value: &'a RawValue, field: &str) -> FieldResult<&'a RawValue> {
    if value.is_missing() {
        return Err(FieldValidationError::empty(field));
    }
    if let RawValue::Text(s) = value {
        if s.trim().is_empty() {
            return Err(FieldValidationError::empty(field));
        }
    }
    Ok(value)
}

/// Normalize locale-formatted numeric text: drops whitespace (including non-breaking spaces used
/// as thousands separators), turns `,` into `.`, and removes plain and typographic quotes.
pub fn normalize_numeric_string(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !QUOTE_CHARS.contains(c))
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

fn not_a_number(field: &str, raw: &impl std::fmt::Display) -> FieldValidationError {
    FieldValidationError::new(field, format!("field '{field}' must be a number, got: {raw}"))
}

/// Parse a floating-point field.
pub fn parse_float(value: &RawValue, field: &str) -> FieldResult<f64> {
    match require_value(value, field)? {
        RawValue::Float(f) if f.is_finite() => Ok(*f),
        RawValue::Int(i) => Ok(*i as f64),
        RawValue::Text(s) => {
            let normalized = normalize_numeric_string(s);
            normalized
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| not_a_number(field, &normalized))
        }
        other => Err(not_a_number(field, other)),
    }
}

/// Parse an integer field.
///
/// Integral floats (`12.0`, `"12,0"`) are accepted; fractional ones are rejected rather than
/// truncated.
pub fn parse_int(value: &RawValue, field: &str) -> FieldResult<i64> {
    match require_value(value, field)? {
        RawValue::Int(i) => Ok(*i),
        RawValue::Float(f) => integral_f64(*f).ok_or_else(|| not_a_number(field, f)),
        RawValue::Text(s) => {
            let normalized = normalize_numeric_string(s);
            normalized
                .parse::<i64>()
                .ok()
                .or_else(|| normalized.parse::<f64>().ok().and_then(integral_f64))
                .ok_or_else(|| not_a_number(field, &normalized))
        }
        other => Err(not_a_number(field, other)),
    }
}

fn integral_f64(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= LIMIT {
        Some(f as i64)
    } else {
        None
    }
}

/// Parse a free-text field: present, non-blank, trimmed.
pub fn parse_str(value: &RawValue, field: &str) -> FieldResult<String> {
    let value = require_value(value, field)?;
    Ok(value.to_string().trim().to_string())
}

/// Parse the object identifier: present, trimmed, and matching `^[A-Za-z0-9_-]{3,50}$`.
pub fn parse_object_id(value: &RawValue, field: &str) -> FieldResult<String> {
    let candidate = parse_str(value, field)?;
    let pattern = OBJECT_ID_PATTERN.as_ref().map_err(|e| {
        FieldValidationError::new(field, format!("field '{field}' cannot be validated: {e}"))
    })?;
    if pattern.is_match(&candidate) {
        Ok(candidate)
    } else {
        Err(FieldValidationError::new(
            field,
            format!(
                "field '{field}' has invalid format (expected 3-50 characters of A-Z, a-z, 0-9, \
                 '_' or '-'), got: {candidate}"
            ),
        ))
    }
}

/// Parse a calendar date.
///
/// Numeric cells are spreadsheet serial numbers. Text may be ISO (`2024-03-15`), day-first
/// (`15.03.2024`, `15/03/24`), carry a time of day (`2024-03-15 10:30:00`, RFC 3339), spell the
/// month (`15 March 2024`, `Mar 15, 2024`), be compact (`20240315`), or name only a month
/// (`2024-03`, `03.2024`), which resolves to the first day of that month.
pub fn parse_date(value: &RawValue, field: &str) -> FieldResult<NaiveDate> {
    let not_a_date = |raw: &dyn std::fmt::Display| {
        FieldValidationError::new(field, format!("field '{field}' must be a date, got: {raw}"))
    };

    match require_value(value, field)? {
        RawValue::DateSerial(f) | RawValue::Float(f) => {
            date_from_serial(*f).ok_or_else(|| not_a_date(f))
        }
        RawValue::Int(i) => date_from_serial(*i as f64).ok_or_else(|| not_a_date(i)),
        RawValue::Text(s) => parse_date_text(s.trim()).ok_or_else(|| not_a_date(s)),
        other => Err(not_a_date(other)),
    }
}

fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.trunc() as u64))
}

const ISO_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DAY_FIRST_FORMATS: [&str; 3] = ["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"];
const DAY_FIRST_SHORT_YEAR_FORMATS: [&str; 3] = ["%d.%m.%y", "%d/%m/%y", "%d-%m-%y"];
const TEXTUAL_FORMATS: [&str; 6] = [
    "%d %B %Y",
    "%d %B, %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d-%b-%Y",
    "%Y %B %d",
];
const MONTH_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"];

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    let date_part = strip_time_of_day(text);
    let try_formats = |formats: &[&str]| {
        formats
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(date_part, f).ok())
    };

    // `%Y` also takes one to three digits, so `15.03.24` would read as year 15.
    let year_first = date_part
        .split(['.', '/', '-'])
        .next()
        .is_some_and(|year| year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()));
    if year_first {
        if let Some(d) = try_formats(&ISO_FORMATS) {
            return Some(d);
        }
    }
    let short_year = date_part
        .rsplit(['.', '/', '-'])
        .next()
        .is_some_and(|year| year.len() == 2 && year.chars().all(|c| c.is_ascii_digit()));
    let day_first = if short_year {
        try_formats(&DAY_FIRST_SHORT_YEAR_FORMATS)
    } else {
        try_formats(&DAY_FIRST_FORMATS)
    };
    if day_first.is_some() {
        return day_first;
    }
    if let Some(d) = try_formats(&TEXTUAL_FORMATS) {
        return Some(d);
    }
    if date_part.len() == 8 && date_part.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, "%Y%m%d") {
            return Some(d);
        }
    }
    parse_month_only(date_part)
}

/// `2024-03 10:00` and `2024-03-15T10:00:00` keep only the part before the time of day.
fn strip_time_of_day(text: &str) -> &str {
    let Some(colon) = text.find(':') else {
        return text;
    };
    match text[..colon].rfind([' ', 'T']) {
        Some(sep) => text[..sep].trim_end(),
        None => text,
    }
}

fn parse_month_only(text: &str) -> Option<NaiveDate> {
    let with_day = [
        format!("{text}-01"),
        format!("{text}/01"),
        format!("01.{text}"),
        format!("01/{text}"),
    ];
    MONTH_FORMATS
        .iter()
        .zip(with_day.iter())
        .find_map(|(f, candidate)| NaiveDate::parse_from_str(candidate, f).ok())
}
