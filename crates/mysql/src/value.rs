//! Conversion between MySQL values and sync-core values.
//!
//! The text protocol hands every non-null cell back as bytes, so reading
//! is driven by the column type the server reports.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::{Column, Value as MySqlValue};
use sync_core::Value;
use thiserror::Error;

/// Error during MySQL value conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Type mismatch in column '{column}': expected {expected}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: MySqlValue,
    },
    #[error("Invalid date/time value in column '{0}'")]
    InvalidDateTime(String),
}

/// Convert one cell read from `column`.
pub fn from_mysql(value: MySqlValue, column: &Column) -> Result<Value, ConversionError> {
    use ColumnType::*;

    if matches!(value, MySqlValue::NULL) {
        return Ok(Value::Null);
    }

    let name = column.name_str().to_string();
    match column.column_type() {
        MYSQL_TYPE_TINY | MYSQL_TYPE_SHORT | MYSQL_TYPE_INT24 | MYSQL_TYPE_LONG
        | MYSQL_TYPE_LONGLONG | MYSQL_TYPE_YEAR => {
            if column.flags().contains(ColumnFlags::UNSIGNED_FLAG) {
                extract_uint(&value, &name).map(Value::UInt)
            } else {
                extract_int(&value, &name).map(Value::Int)
            }
        }

        MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE => extract_float(&value, &name).map(Value::Float),

        // Kept as text so no precision is lost
        MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => {
            extract_string(&value, &name).map(Value::Text)
        }

        MYSQL_TYPE_DATE | MYSQL_TYPE_NEWDATE => extract_date(&value, &name).map(Value::Date),

        MYSQL_TYPE_DATETIME | MYSQL_TYPE_DATETIME2 | MYSQL_TYPE_TIMESTAMP
        | MYSQL_TYPE_TIMESTAMP2 => extract_datetime(&value, &name).map(Value::DateTime),

        MYSQL_TYPE_TIME | MYSQL_TYPE_TIME2 => extract_time(&value, &name).map(Value::Text),

        MYSQL_TYPE_TINY_BLOB | MYSQL_TYPE_MEDIUM_BLOB | MYSQL_TYPE_LONG_BLOB
        | MYSQL_TYPE_BLOB | MYSQL_TYPE_VAR_STRING | MYSQL_TYPE_STRING | MYSQL_TYPE_VARCHAR
            if column.character_set() == BINARY_CHARSET =>
        {
            extract_bytes(&value, &name).map(Value::Bytes)
        }

        _ => extract_string(&value, &name).map(Value::Text),
    }
}

/// Convert one value for use as a statement parameter.
pub fn to_mysql(value: &Value) -> MySqlValue {
    match value {
        Value::Null => MySqlValue::NULL,
        Value::Bool(b) => MySqlValue::Int(i64::from(*b)),
        Value::Int(i) => MySqlValue::Int(*i),
        Value::UInt(u) => MySqlValue::UInt(*u),
        Value::Float(f) if f.is_nan() => MySqlValue::NULL,
        Value::Float(f) => MySqlValue::Double(*f),
        Value::Text(s) => MySqlValue::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => MySqlValue::Bytes(b.clone()),
        Value::Date(d) => {
            use chrono::Datelike;
            MySqlValue::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
        }
        Value::DateTime(dt) => {
            use chrono::{Datelike, Timelike};
            MySqlValue::Date(
                dt.year() as u16,
                dt.month() as u8,
                dt.day() as u8,
                dt.hour() as u8,
                dt.minute() as u8,
                dt.second() as u8,
                dt.nanosecond() / 1_000,
            )
        }
    }
}

/// Character set id MySQL reports for binary strings.
const BINARY_CHARSET: u16 = 63;

fn mismatch(value: &MySqlValue, column: &str, expected: &'static str) -> ConversionError {
    ConversionError::TypeMismatch {
        column: column.to_string(),
        expected,
        actual: value.clone(),
    }
}

fn extract_int(value: &MySqlValue, column: &str) -> Result<i64, ConversionError> {
    match value {
        MySqlValue::Int(i) => Ok(*i),
        MySqlValue::UInt(u) => i64::try_from(*u).map_err(|_| mismatch(value, column, "integer")),
        MySqlValue::Bytes(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| mismatch(value, column, "integer")),
        _ => Err(mismatch(value, column, "integer")),
    }
}

fn extract_uint(value: &MySqlValue, column: &str) -> Result<u64, ConversionError> {
    match value {
        MySqlValue::UInt(u) => Ok(*u),
        MySqlValue::Int(i) => u64::try_from(*i).map_err(|_| mismatch(value, column, "unsigned")),
        MySqlValue::Bytes(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| mismatch(value, column, "unsigned")),
        _ => Err(mismatch(value, column, "unsigned")),
    }
}

fn extract_float(value: &MySqlValue, column: &str) -> Result<f64, ConversionError> {
    match value {
        MySqlValue::Float(f) => Ok(f64::from(*f)),
        MySqlValue::Double(d) => Ok(*d),
        MySqlValue::Int(i) => Ok(*i as f64),
        MySqlValue::UInt(u) => Ok(*u as f64),
        MySqlValue::Bytes(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| mismatch(value, column, "float")),
        _ => Err(mismatch(value, column, "float")),
    }
}

fn extract_string(value: &MySqlValue, column: &str) -> Result<String, ConversionError> {
    match value {
        MySqlValue::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
        MySqlValue::Int(i) => Ok(i.to_string()),
        MySqlValue::UInt(u) => Ok(u.to_string()),
        MySqlValue::Float(f) => Ok(f.to_string()),
        MySqlValue::Double(d) => Ok(d.to_string()),
        _ => Err(mismatch(value, column, "string")),
    }
}

fn extract_bytes(value: &MySqlValue, column: &str) -> Result<Vec<u8>, ConversionError> {
    match value {
        MySqlValue::Bytes(b) => Ok(b.clone()),
        _ => Err(mismatch(value, column, "bytes")),
    }
}

fn extract_date(value: &MySqlValue, column: &str) -> Result<NaiveDate, ConversionError> {
    match value {
        MySqlValue::Date(year, month, day, _, _, _, _) => {
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .ok_or_else(|| ConversionError::InvalidDateTime(column.to_string()))
        }
        MySqlValue::Bytes(b) => {
            let s = String::from_utf8_lossy(b);
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| ConversionError::InvalidDateTime(column.to_string()))
        }
        _ => Err(mismatch(value, column, "date")),
    }
}

fn extract_datetime(value: &MySqlValue, column: &str) -> Result<NaiveDateTime, ConversionError> {
    let invalid = || ConversionError::InvalidDateTime(column.to_string());
    match value {
        MySqlValue::Date(year, month, day, hour, min, sec, micro) => Ok(NaiveDateTime::new(
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .ok_or_else(invalid)?,
            NaiveTime::from_hms_micro_opt(u32::from(*hour), u32::from(*min), u32::from(*sec), *micro)
                .ok_or_else(invalid)?,
        )),
        MySqlValue::Bytes(b) => {
            let s = String::from_utf8_lossy(b);
            NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f").map_err(|_| invalid())
        }
        _ => Err(mismatch(value, column, "datetime")),
    }
}

fn extract_time(value: &MySqlValue, column: &str) -> Result<String, ConversionError> {
    match value {
        MySqlValue::Time(negative, days, hours, minutes, seconds, _) => {
            let total_hours = days * 24 + u32::from(*hours);
            let sign = if *negative { "-" } else { "" };
            Ok(format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}"))
        }
        MySqlValue::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
        _ => Err(mismatch(value, column, "time")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_mysql_scalars() {
        assert_eq!(to_mysql(&Value::Null), MySqlValue::NULL);
        assert_eq!(to_mysql(&Value::Bool(true)), MySqlValue::Int(1));
        assert_eq!(to_mysql(&Value::Int(-3)), MySqlValue::Int(-3));
        assert_eq!(to_mysql(&Value::Float(f64::NAN)), MySqlValue::NULL);
        assert_eq!(
            to_mysql(&Value::text("2024-01-01")),
            MySqlValue::Bytes(b"2024-01-01".to_vec())
        );
    }

    #[test]
    fn test_to_mysql_temporal() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            to_mysql(&Value::Date(date)),
            MySqlValue::Date(2024, 2, 29, 0, 0, 0, 0)
        );
        let dt = date.and_hms_micro_opt(23, 59, 58, 123_456).unwrap();
        assert_eq!(
            to_mysql(&Value::DateTime(dt)),
            MySqlValue::Date(2024, 2, 29, 23, 59, 58, 123_456)
        );
    }

    #[test]
    fn test_extract_from_text_protocol_bytes() {
        let v = MySqlValue::Bytes(b"42".to_vec());
        assert_eq!(extract_int(&v, "c").unwrap(), 42);
        assert_eq!(extract_float(&v, "c").unwrap(), 42.0);
        assert_eq!(
            extract_date(&MySqlValue::Bytes(b"2024-03-01".to_vec()), "c").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            extract_datetime(&MySqlValue::Bytes(b"2024-03-01 10:11:12".to_vec()), "c")
                .unwrap()
                .date(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(extract_int(&MySqlValue::Bytes(b"abc".to_vec()), "c").is_err());
    }

    #[test]
    fn test_extract_time_spanning_days() {
        let v = MySqlValue::Time(true, 1, 2, 3, 4, 0);
        assert_eq!(extract_time(&v, "c").unwrap(), "-26:03:04");
    }
}
