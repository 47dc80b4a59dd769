//! Per-column value coercion.
//!
//! Each column's [`TypeClass`] (looked up in [`crate::core::schema::COLUMNS`])
//! selects one coercion rule. Columns that are not in the table pass through.

use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;
use tracing::debug;

use crate::core::schema::{type_class, TypeClass, COLUMNS, COLUMN_COUNT};
use crate::core::value::{Row, SqlValue};

/// A present value could not be coerced to its column's type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert {value} ({value_type}) for column {column}: {reason}")]
pub struct ConversionError {
    pub column: String,
    pub value: String,
    pub value_type: &'static str,
    pub reason: String,
}

impl ConversionError {
    fn new(column: &str, value: &SqlValue, reason: impl Into<String>) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
            value_type: value.type_name(),
            reason: reason.into(),
        }
    }
}

/// Convert one cell to the destination type of `column`.
pub fn convert_value(value: SqlValue, column: &str) -> Result<SqlValue, ConversionError> {
    let Some(class) = type_class(column) else {
        return Ok(value);
    };

    if value.is_null() {
        return Ok(zero_value(class));
    }

    coerce(class, &value)
        .map_err(|reason| ConversionError::new(column, &value, reason))
        .inspect_err(|e| debug!("{}", e))
}

/// Convert a full source row positionally.
pub fn convert_row(raw: Row) -> Result<Row, ConversionError> {
    if raw.len() != COLUMN_COUNT {
        return Err(ConversionError {
            column: "*".to_string(),
            value: format!("{} cells", raw.len()),
            value_type: "row",
            reason: format!("expected {} cells", COLUMN_COUNT),
        });
    }

    raw.into_iter()
        .zip(COLUMNS.iter())
        .map(|(value, col)| convert_value(value, col.name))
        .collect()
}

/// Value substituted for NULL.
fn zero_value(class: TypeClass) -> SqlValue {
    match class {
        TypeClass::IntNotNull => SqlValue::I64(0),
        TypeClass::FloatNotNull => SqlValue::F64(0.0),
        TypeClass::StringNotNull => SqlValue::Text(String::new()),
        _ => SqlValue::Null,
    }
}

fn coerce(class: TypeClass, value: &SqlValue) -> Result<SqlValue, String> {
    match class {
        TypeClass::IntNotNull | TypeClass::IntNullable => to_i64(value).map(SqlValue::I64),
        TypeClass::FloatNotNull | TypeClass::FloatNullable => to_f64(value).map(SqlValue::F64),
        TypeClass::DateTimePassthrough => match value {
            SqlValue::Bytes(_) => Err("raw bytes are not a datetime".to_string()),
            other => Ok(other.clone()),
        },
        TypeClass::Int32Required => {
            let v = to_i64(value)?;
            i32::try_from(v)
                .map(SqlValue::I32)
                .map_err(|_| format!("{} does not fit in 32 bits", v))
        }
        TypeClass::StringNotNull | TypeClass::StringNullable => {
            to_string(value).map(SqlValue::Text)
        }
    }
}

fn to_i64(value: &SqlValue) -> Result<i64, String> {
    match value {
        SqlValue::Bool(b) => Ok(i64::from(*b)),
        SqlValue::I16(v) => Ok(i64::from(*v)),
        SqlValue::I32(v) => Ok(i64::from(*v)),
        SqlValue::I64(v) => Ok(*v),
        SqlValue::F32(v) => float_to_i64(f64::from(*v)),
        SqlValue::F64(v) => float_to_i64(*v),
        SqlValue::Decimal(d) => d
            .trunc()
            .to_i64()
            .ok_or_else(|| "decimal out of integer range".to_string()),
        SqlValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid integer literal: {}", e)),
        other => Err(format!("{} is not convertible to integer", other.type_name())),
    }
}

fn float_to_i64(v: f64) -> Result<i64, String> {
    if !v.is_finite() {
        return Err(format!("cannot convert {} to integer", v));
    }
    let t = v.trunc();
    if t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return Err("float out of integer range".to_string());
    }
    Ok(t as i64)
}

fn to_f64(value: &SqlValue) -> Result<f64, String> {
    match value {
        SqlValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        SqlValue::I16(v) => Ok(f64::from(*v)),
        SqlValue::I32(v) => Ok(f64::from(*v)),
        SqlValue::I64(v) => Ok(*v as f64),
        SqlValue::F32(v) => Ok(f64::from(*v)),
        SqlValue::F64(v) => Ok(*v),
        SqlValue::Decimal(d) => d
            .to_f64()
            .ok_or_else(|| "decimal out of float range".to_string()),
        SqlValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid float literal: {}", e)),
        other => Err(format!("{} is not convertible to float", other.type_name())),
    }
}

fn to_string(value: &SqlValue) -> Result<String, String> {
    match value {
        SqlValue::Text(s) => Ok(s.clone()),
        SqlValue::Bytes(b) => {
            String::from_utf8(b.clone()).map_err(|e| format!("invalid UTF-8: {}", e))
        }
        other => Ok(other.to_string()),
    }
}
