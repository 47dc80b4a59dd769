//! Fixed schema of the migrated table.
//!
//! The column order here is the order of the source SELECT, of every
//! converted row and of both destination INSERT statements.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Default name of the migrated table (identical in all three stores).
pub const DEFAULT_TABLE: &str = "PROFILEPRICE";

/// Row identity column, also the keyset pagination cursor.
pub const KEY_COLUMN: &str = "PRICEID";

/// Position of [`KEY_COLUMN`] in [`COLUMNS`].
pub const KEY_POSITION: usize = 0;

/// Column holding the creation timestamp filtered by the migration window.
pub const WINDOW_COLUMN: &str = "CREATED";

/// Coercion class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// 64-bit integer, NULL becomes `0`.
    IntNotNull,
    /// 64-bit integer, NULL stays NULL.
    IntNullable,
    /// 64-bit float, NULL becomes `0.0`.
    FloatNotNull,
    /// 64-bit float, NULL stays NULL.
    FloatNullable,
    /// Timestamps are written as read.
    DateTimePassthrough,
    /// 32-bit integer without a NULL default.
    Int32Required,
    /// String, NULL becomes `""`.
    StringNotNull,
    /// String, NULL stays NULL.
    StringNullable,
}

impl TypeClass {
    /// Whether NULL is replaced by a zero value.
    pub fn is_not_null(self) -> bool {
        matches!(
            self,
            TypeClass::IntNotNull | TypeClass::FloatNotNull | TypeClass::StringNotNull
        )
    }
}

/// A column of the migrated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub class: TypeClass,
}

const fn col(name: &'static str, class: TypeClass) -> ColumnSpec {
    ColumnSpec { name, class }
}

/// Number of migrated columns.
pub const COLUMN_COUNT: usize = 20;

/// The migrated columns in positional order.
pub const COLUMNS: [ColumnSpec; COLUMN_COUNT] = [
    col("PRICEID", TypeClass::IntNotNull),
    col("PRICE", TypeClass::FloatNotNull),
    col("CREATED", TypeClass::DateTimePassthrough),
    col("PRICETYPE", TypeClass::Int32Required),
    col("VAT", TypeClass::FloatNotNull),
    col("DEACTIVATED", TypeClass::DateTimePassthrough),
    col("EXCHANGERATETOEURO", TypeClass::FloatNotNull),
    col("CURRENCY", TypeClass::StringNotNull),
    col("PROFILE_PROFILEID", TypeClass::IntNullable),
    col("CREATOR_USERID", TypeClass::IntNullable),
    col("COMPANY_COMPANYID", TypeClass::StringNullable),
    col("PRICEVIEW_PRICEVIEWID", TypeClass::IntNullable),
    col("METAINFOS_ID", TypeClass::IntNullable),
    col("ATTENDANCEPRICE", TypeClass::FloatNullable),
    col("PRICEWITHOUTATTENDANCE", TypeClass::FloatNullable),
    col("ORIGIN_ID", TypeClass::IntNotNull),
    col("ORIGIN_TOOL", TypeClass::StringNotNull),
    col("ORIGIN_USERID", TypeClass::IntNotNull),
    col("ORIGIN_METAINFOS_ID", TypeClass::IntNullable),
    col("MODIFIED", TypeClass::DateTimePassthrough),
];

/// Look up the coercion class of a column. `None` means passthrough.
pub fn type_class(column: &str) -> Option<TypeClass> {
    COLUMNS.iter().find(|c| c.name == column).map(|c| c.class)
}

/// Position of a column in [`COLUMNS`].
pub fn column_index(column: &str) -> Option<usize> {
    COLUMNS.iter().position(|c| c.name == column)
}

/// Column names in positional order.
pub fn column_names() -> impl Iterator<Item = &'static str> {
    COLUMNS.iter().map(|c| c.name)
}

/// Half-open `[start, end)` interval on the `CREATED` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MigrationWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Whether a timestamp falls inside the window.
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        *ts >= self.start && *ts < self.end
    }
}

impl Default for MigrationWindow {
    /// January 2024.
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2024, 2, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self { start, end }
    }
}
