//! Typed analytical row.
//!
//! Building a [`PriceRecord`] from a converted row is the insert-time type
//! check for the analytical store: every cell must already have the exact
//! variant its ClickHouse column expects.

use chrono::{DateTime, NaiveDateTime, Utc};
use clickhouse::Row;
use serde::Serialize;

use crate::core::schema::COLUMNS;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// One `PROFILEPRICE` row as written to ClickHouse.
#[derive(Debug, Clone, PartialEq, Row, Serialize)]
pub struct PriceRecord {
    #[serde(rename = "PRICEID")]
    pub price_id: i64,
    #[serde(rename = "PRICE")]
    pub price: f64,
    #[serde(rename = "CREATED", with = "clickhouse::serde::chrono::datetime")]
    pub created: DateTime<Utc>,
    #[serde(rename = "PRICETYPE")]
    pub price_type: i32,
    #[serde(rename = "VAT")]
    pub vat: f64,
    #[serde(rename = "DEACTIVATED", with = "clickhouse::serde::chrono::datetime::option")]
    pub deactivated: Option<DateTime<Utc>>,
    #[serde(rename = "EXCHANGERATETOEURO")]
    pub exchange_rate_to_euro: f64,
    #[serde(rename = "CURRENCY")]
    pub currency: String,
    #[serde(rename = "PROFILE_PROFILEID")]
    pub profile_id: Option<i64>,
    #[serde(rename = "CREATOR_USERID")]
    pub creator_user_id: Option<i64>,
    #[serde(rename = "COMPANY_COMPANYID")]
    pub company_id: Option<String>,
    #[serde(rename = "PRICEVIEW_PRICEVIEWID")]
    pub price_view_id: Option<i64>,
    #[serde(rename = "METAINFOS_ID")]
    pub meta_infos_id: Option<i64>,
    #[serde(rename = "ATTENDANCEPRICE")]
    pub attendance_price: Option<f64>,
    #[serde(rename = "PRICEWITHOUTATTENDANCE")]
    pub price_without_attendance: Option<f64>,
    #[serde(rename = "ORIGIN_ID")]
    pub origin_id: i64,
    #[serde(rename = "ORIGIN_TOOL")]
    pub origin_tool: String,
    #[serde(rename = "ORIGIN_USERID")]
    pub origin_user_id: i64,
    #[serde(rename = "ORIGIN_METAINFOS_ID")]
    pub origin_meta_infos_id: Option<i64>,
    #[serde(rename = "MODIFIED", with = "clickhouse::serde::chrono::datetime::option")]
    pub modified: Option<DateTime<Utc>>,
}

impl PriceRecord {
    /// Type-check a converted row and build the analytical record.
    pub fn from_row(row: &[SqlValue]) -> Result<Self> {
        if row.len() != COLUMNS.len() {
            return Err(MigrateError::TypeCheck {
                column: "*".to_string(),
                expected: "20 cells",
                found: format!("{} cells", row.len()),
            });
        }
        let cells = Cells(row);

        Ok(Self {
            price_id: cells.i64(0)?,
            price: cells.f64(1)?,
            created: cells.datetime(2)?,
            price_type: cells.i32(3)?,
            vat: cells.f64(4)?,
            deactivated: cells.opt_datetime(5)?,
            exchange_rate_to_euro: cells.f64(6)?,
            currency: cells.string(7)?,
            profile_id: cells.opt_i64(8)?,
            creator_user_id: cells.opt_i64(9)?,
            company_id: cells.opt_string(10)?,
            price_view_id: cells.opt_i64(11)?,
            meta_infos_id: cells.opt_i64(12)?,
            attendance_price: cells.opt_f64(13)?,
            price_without_attendance: cells.opt_f64(14)?,
            origin_id: cells.i64(15)?,
            origin_tool: cells.string(16)?,
            origin_user_id: cells.i64(17)?,
            origin_meta_infos_id: cells.opt_i64(18)?,
            modified: cells.opt_datetime(19)?,
        })
    }
}

struct Cells<'a>(&'a [SqlValue]);

impl Cells<'_> {
    fn mismatch(&self, idx: usize, expected: &'static str) -> MigrateError {
        MigrateError::TypeCheck {
            column: COLUMNS[idx].name.to_string(),
            expected,
            found: self.0[idx].type_name().to_string(),
        }
    }

    fn opt_i64(&self, idx: usize) -> Result<Option<i64>> {
        match &self.0[idx] {
            SqlValue::Null => Ok(None),
            SqlValue::I64(v) => Ok(Some(*v)),
            _ => Err(self.mismatch(idx, "Nullable(Int64)")),
        }
    }

    fn i64(&self, idx: usize) -> Result<i64> {
        match &self.0[idx] {
            SqlValue::I64(v) => Ok(*v),
            _ => Err(self.mismatch(idx, "Int64")),
        }
    }

    fn i32(&self, idx: usize) -> Result<i32> {
        match &self.0[idx] {
            SqlValue::I32(v) => Ok(*v),
            _ => Err(self.mismatch(idx, "Int32")),
        }
    }

    fn opt_f64(&self, idx: usize) -> Result<Option<f64>> {
        match &self.0[idx] {
            SqlValue::Null => Ok(None),
            SqlValue::F64(v) => Ok(Some(*v)),
            _ => Err(self.mismatch(idx, "Nullable(Float64)")),
        }
    }

    fn f64(&self, idx: usize) -> Result<f64> {
        match &self.0[idx] {
            SqlValue::F64(v) => Ok(*v),
            _ => Err(self.mismatch(idx, "Float64")),
        }
    }

    fn opt_string(&self, idx: usize) -> Result<Option<String>> {
        match &self.0[idx] {
            SqlValue::Null => Ok(None),
            SqlValue::Text(v) => Ok(Some(v.clone())),
            _ => Err(self.mismatch(idx, "Nullable(String)")),
        }
    }

    fn string(&self, idx: usize) -> Result<String> {
        match &self.0[idx] {
            SqlValue::Text(v) => Ok(v.clone()),
            _ => Err(self.mismatch(idx, "String")),
        }
    }

    fn opt_datetime(&self, idx: usize) -> Result<Option<DateTime<Utc>>> {
        match &self.0[idx] {
            SqlValue::Null => Ok(None),
            SqlValue::DateTime(v) => Ok(Some(to_utc(v))),
            SqlValue::Date(d) => Ok(d.and_hms_opt(0, 0, 0).map(|v| to_utc(&v))),
            _ => Err(self.mismatch(idx, "Nullable(DateTime)")),
        }
    }

    fn datetime(&self, idx: usize) -> Result<DateTime<Utc>> {
        self.opt_datetime(idx)?
            .ok_or_else(|| self.mismatch(idx, "DateTime"))
    }
}

fn to_utc(v: &NaiveDateTime) -> DateTime<Utc> {
    v.and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::convert_row;
    use chrono::NaiveDate;

    fn raw_row() -> Vec<SqlValue> {
        let created = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        vec![
            SqlValue::I64(101),
            SqlValue::F64(49.5),
            SqlValue::DateTime(created),
            SqlValue::I32(1),
            SqlValue::F64(19.0),
            SqlValue::Null,
            SqlValue::F64(1.0),
            SqlValue::text("EUR"),
            SqlValue::I64(55),
            SqlValue::Null,
            SqlValue::text("C-9"),
            SqlValue::Null,
            SqlValue::I64(3),
            SqlValue::Null,
            SqlValue::F64(40.0),
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::I64(8),
            SqlValue::Null,
            SqlValue::DateTime(created),
        ]
    }

    #[test]
    fn test_from_converted_row() {
        let row = convert_row(raw_row()).unwrap();
        let record = PriceRecord::from_row(&row).unwrap();
        assert_eq!(record.price_id, 101);
        assert_eq!(record.price_type, 1);
        assert_eq!(record.origin_id, 0);
        assert_eq!(record.origin_tool, "");
        assert_eq!(record.company_id.as_deref(), Some("C-9"));
        assert_eq!(record.attendance_price, None);
        assert_eq!(record.created.timestamp(), 1_704_878_100);
        assert!(record.deactivated.is_none());
    }

    #[test]
    fn test_missing_created_fails_type_check() {
        let mut raw = raw_row();
        raw[2] = SqlValue::Null;
        let row = convert_row(raw).unwrap();
        match PriceRecord::from_row(&row) {
            Err(MigrateError::TypeCheck { column, expected, .. }) => {
                assert_eq!(column, "CREATED");
                assert_eq!(expected, "DateTime");
            }
            other => panic!("expected type check error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_price_type_fails_type_check() {
        let mut raw = raw_row();
        raw[3] = SqlValue::Null;
        let row = convert_row(raw).unwrap();
        assert!(matches!(
            PriceRecord::from_row(&row),
            Err(MigrateError::TypeCheck { .. })
        ));
    }

    #[test]
    fn test_unconverted_row_fails_type_check() {
        // Raw I32 in an Int64 column is rejected until converted.
        let mut raw = raw_row();
        raw[0] = SqlValue::I32(101);
        assert!(PriceRecord::from_row(&raw).is_err());
    }
}
