//! Calendar date helpers.
//!
//! Every date that crosses a module boundary is a [`NaiveDate`]; the only
//! string form used on the wire is `YYYY-MM-DD`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::{Result, SyncError, Value};

/// Canonical date format used in SQL literals and written index columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y/%m/%d %H:%M:%S"];

/// Render a date in the canonical format.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a date from the textual forms sources commonly produce.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYYMMDD`, `YYYY-MM` (first day of
/// the month), datetimes with a space or `T` separator, and RFC 3339.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.date());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    // Monthly partitions ("2023-01")
    if let Some((year, month)) = s.split_once('-') {
        if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                return Ok(date);
            }
        }
    }

    Err(SyncError::InvalidDate(s.to_string()))
}

/// Interpret a cell as a calendar date.
pub fn date_from_value(value: &Value) -> Result<NaiveDate> {
    match value {
        Value::Date(d) => Ok(*d),
        Value::DateTime(dt) => Ok(dt.date()),
        Value::Text(s) => parse_date(s),
        Value::Bytes(b) => parse_date(&String::from_utf8_lossy(b)),
        Value::Int(_) | Value::UInt(_) => {
            let digits = value.as_i64().map(|i| i.to_string()).unwrap_or_default();
            if digits.len() == 8 {
                NaiveDate::parse_from_str(&digits, "%Y%m%d")
                    .map_err(|_| SyncError::InvalidDate(digits))
            } else {
                Err(SyncError::InvalidDate(format!("{value:?}")))
            }
        }
        other => Err(SyncError::InvalidDate(format!("{other:?}"))),
    }
}

/// Every date from `start` to `end`, both inclusive.
///
/// Returns an empty list when `start > end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Render dates as a comma-joined list of quoted SQL literals.
///
/// An empty list renders as `NULL` so that `col IN (...)` stays valid and
/// matches nothing.
pub fn sql_date_list(dates: &[NaiveDate]) -> String {
    if dates.is_empty() {
        return "NULL".to_string();
    }
    dates
        .iter()
        .map(|d| format!("'{}'", format_date(*d)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Calendar year of a date, used for year-sharded table names.
pub fn year_of(date: NaiveDate) -> i32 {
    date.year()
}
