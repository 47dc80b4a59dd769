//! SQL value types for moving cells between the source and the destinations.
//!
//! The source reader produces cells in whatever shape the source column
//! decodes to; the converter narrows them to the destination types.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Absent value.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (tinyint/smallint).
    I16(i16),

    /// 32-bit signed integer (int/mediumint).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (float).
    F32(f32),

    /// 64-bit floating point (double).
    F64(f64),

    /// Fixed-point decimal.
    Decimal(Decimal),

    /// Text/string data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

/// One row of cells, positionally aligned with [`crate::core::schema::COLUMNS`].
pub type Row = Vec<SqlValue>;

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Name of the observed value type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::I16(_) => "i16",
            SqlValue::I32(_) => "i32",
            SqlValue::I64(_) => "i64",
            SqlValue::F32(_) => "f32",
            SqlValue::F64(_) => "f64",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::DateTime(_) => "datetime",
            SqlValue::Date(_) => "date",
            SqlValue::Time(_) => "time",
        }
    }

    /// Create a text value.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        SqlValue::Text(s.into())
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::I16(v) => write!(f, "{}", v),
            SqlValue::I32(v) => write!(f, "{}", v),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::F32(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Decimal(v) => write!(f, "{}", v),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Bytes(v) => write!(f, "0x{}", hex::encode(v)),
            SqlValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            SqlValue::Date(v) => write!(f, "{}", v),
            SqlValue::Time(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
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

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// A page of source rows.
#[derive(Debug, Default)]
pub struct Batch {
    /// Rows in source key order.
    pub rows: Vec<Row>,
}

impl Batch {
    /// Create a new batch with the given rows.
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Get the number of rows in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render a row the way it is written to the log when it is skipped.
pub fn display_row(row: &[SqlValue]) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|v| match v {
            SqlValue::Text(s) => format!("'{}'", s),
            other => other.to_string(),
        })
        .collect();
    format!("({})", cells.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::I32(42).is_null());
    }

    #[test]
    fn test_from_option() {
        let v: SqlValue = Option::<i64>::None.into();
        assert_eq!(v, SqlValue::Null);

        let v: SqlValue = Some(7i64).into();
        assert_eq!(v, SqlValue::I64(7));
    }

    #[test]
    fn test_display_row() {
        let row = vec![SqlValue::I64(1), SqlValue::text("EUR"), SqlValue::Null];
        assert_eq!(display_row(&row), "(1, 'EUR', NULL)");
    }

    #[test]
    fn test_datetime_display() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(SqlValue::DateTime(dt).to_string(), "2024-01-15 08:30:00");
    }

    #[test]
    fn test_batch_len() {
        let batch = Batch::new(vec![vec![SqlValue::I64(1)], vec![SqlValue::I64(2)]]);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert!(Batch::default().is_empty());
    }
}
