//! Dynamically-typed column values.
//!
//! Source columns carry no static type once a `SELECT *` has been issued, so
//! every adapter maps its native types into the closed [`SqlValue`] set.
//! Anything outside the set (decimals, UUIDs, JSON, time-of-day) arrives as
//! text; dates arrive as a midnight timestamp.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer column, widened to 64 bits.
    Int(i64),

    /// Any floating point column, widened to 64 bits.
    Float(f64),

    /// Text data.
    Text(String),

    /// Raw binary data (BLOB, BYTEA, VARBINARY, ...).
    Blob(Vec<u8>),

    /// Timestamp without timezone. Zoned timestamps are converted to UTC.
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Check if this value is a raw binary blob.
    #[must_use]
    pub fn is_blob(&self) -> bool {
        matches!(self, SqlValue::Blob(_))
    }

    /// Short type name for log messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Blob(_) => "blob",
            SqlValue::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(v) => write!(f, "{:?}", v),
            SqlValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
            SqlValue::Timestamp(v) => write!(f, "{}", v),
        }
    }
}

// From implementations for common types
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Float(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Blob(v)
    }
}

impl From<&[u8]> for SqlValue {
    fn from(v: &[u8]) -> Self {
        SqlValue::Blob(v.to_vec())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v.naive_utc())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Timestamp(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::Int(42).is_null());
    }

    #[test]
    fn test_from_implementations() {
        let v: SqlValue = 42i32.into();
        assert_eq!(v, SqlValue::Int(42));

        let v: SqlValue = "hello".to_string().into();
        assert_eq!(v, SqlValue::Text("hello".to_string()));

        let v: SqlValue = b"raw".as_slice().into();
        assert!(v.is_blob());

        let v: SqlValue = Option::<i64>::None.into();
        assert!(v.is_null());
    }

    #[test]
    fn test_date_becomes_midnight_timestamp() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let v: SqlValue = date.into();
        assert_eq!(
            v,
            SqlValue::Timestamp(date.and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlValue::Int(7).to_string(), "7");
        assert_eq!(SqlValue::Text("a".into()).to_string(), "\"a\"");
        assert_eq!(SqlValue::Blob(vec![1, 2, 3]).to_string(), "<3 bytes>");
    }
}
