//! MySQL/MariaDB source reader implementation.
//!
//! Implements the `SourceReader` trait for the legacy `PROFILEPRICE` table.
//! Uses SQLx for connection pooling and async query execution.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use super::quote_ident;
use crate::config::DatabaseConfig;
use crate::core::schema::{column_names, MigrationWindow, KEY_COLUMN, WINDOW_COLUMN};
use crate::core::traits::SourceReader;
use crate::core::value::{Batch, SqlValue};
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL/MariaDB source reader implementation.
pub struct MysqlReader {
    pool: MySqlPool,
    table: String,
}

impl MysqlReader {
    /// Connect to the source database. The run is sequential, so a single
    /// connection is enough.
    pub async fn new(config: &DatabaseConfig, table: &str) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::pool(e, "creating MySQL source pool"))?;

        info!(
            "Connected to MySQL source: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Convert a MySQL row to a vector of cells.
    fn row_to_values(row: &MySqlRow) -> Result<Vec<SqlValue>> {
        (0..row.len()).map(|i| decode_cell(row, i)).collect()
    }
}

/// `COUNT(*)` over the window, optionally past a key.
pub(crate) fn build_count_query(table: &str, with_cursor: bool) -> String {
    let mut sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} >= ? AND {} < ?",
        quote_ident(table),
        quote_ident(WINDOW_COLUMN),
        quote_ident(WINDOW_COLUMN)
    );
    if with_cursor {
        sql.push_str(&format!(" AND {} > ?", quote_ident(KEY_COLUMN)));
    }
    sql
}

/// Keyset-paged SELECT of the migrated columns in positional order.
pub(crate) fn build_select_query(table: &str, with_cursor: bool) -> String {
    let columns: Vec<String> = column_names().map(quote_ident).collect();
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} >= ? AND {} < ?",
        columns.join(", "),
        quote_ident(table),
        quote_ident(WINDOW_COLUMN),
        quote_ident(WINDOW_COLUMN)
    );
    if with_cursor {
        sql.push_str(&format!(" AND {} > ?", quote_ident(KEY_COLUMN)));
    }
    sql.push_str(&format!(" ORDER BY {} LIMIT ?", quote_ident(KEY_COLUMN)));
    sql
}

/// Decode one cell by its wire type.
///
/// A present value the typed decode rejects is retried as text and then kept
/// as its raw bytes, so the converter rejects it (and the row is skipped)
/// rather than seeing NULL. Zero dates and non-UTF-8 text end up as bytes.
fn decode_cell(row: &MySqlRow, i: usize) -> Result<SqlValue> {
    if row.try_get_raw(i)?.is_null() {
        return Ok(SqlValue::Null);
    }

    let type_name = row.column(i).type_info().name().to_uppercase();
    let decoded = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(i).map(SqlValue::Bool),
        "TINYINT" => row.try_get::<i8, _>(i).map(|v| SqlValue::I16(v as i16)),
        "SMALLINT" => row.try_get::<i16, _>(i).map(SqlValue::I16),
        "MEDIUMINT" | "INT" => row.try_get::<i32, _>(i).map(SqlValue::I32),
        "BIGINT" => row.try_get::<i64, _>(i).map(SqlValue::I64),
        "TINYINT UNSIGNED" => row.try_get::<u8, _>(i).map(|v| SqlValue::I16(v as i16)),
        "SMALLINT UNSIGNED" => row.try_get::<u16, _>(i).map(|v| SqlValue::I32(v as i32)),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => {
            row.try_get::<u32, _>(i).map(|v| SqlValue::I64(v as i64))
        }
        "BIGINT UNSIGNED" => row.try_get::<u64, _>(i).map(|v| match i64::try_from(v) {
            Ok(v) => SqlValue::I64(v),
            Err(_) => SqlValue::Text(v.to_string()),
        }),
        "FLOAT" => row.try_get::<f32, _>(i).map(SqlValue::F32),
        "DOUBLE" => row.try_get::<f64, _>(i).map(SqlValue::F64),
        "DECIMAL" => row
            .try_get::<rust_decimal::Decimal, _>(i)
            .map(SqlValue::Decimal),
        "DATETIME" | "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(i).map(SqlValue::DateTime),
        "DATE" => row.try_get::<NaiveDate, _>(i).map(SqlValue::Date),
        "TIME" => row.try_get::<NaiveTime, _>(i).map(SqlValue::Time),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            row.try_get::<Vec<u8>, _>(i).map(SqlValue::Bytes)
        }
        _ => row.try_get::<String, _>(i).map(SqlValue::Text),
    };

    let value = decoded
        .or_else(|e| {
            debug!("Decoding column {} ({}) as text: {}", i, type_name, e);
            row.try_get::<String, _>(i).map(SqlValue::Text)
        })
        .or_else(|e| {
            debug!("Keeping column {} ({}) as raw bytes: {}", i, type_name, e);
            row.try_get_unchecked::<Vec<u8>, _>(i).map(SqlValue::Bytes)
        })?;
    Ok(value)
}

#[async_trait]
impl SourceReader for MysqlReader {
    async fn count_rows(&self, window: &MigrationWindow, after_key: Option<i64>) -> Result<i64> {
        let sql = build_count_query(&self.table, after_key.is_some());
        let mut query = sqlx::query_scalar::<_, i64>(&sql)
            .bind(window.start)
            .bind(window.end);
        if let Some(key) = after_key {
            query = query.bind(key);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn read_batch(
        &self,
        window: &MigrationWindow,
        after_key: Option<i64>,
        limit: usize,
    ) -> Result<Batch> {
        let sql = build_select_query(&self.table, after_key.is_some());
        let mut query = sqlx::query(&sql).bind(window.start).bind(window.end);
        if let Some(key) = after_key {
            query = query.bind(key);
        }
        let rows: Vec<MySqlRow> = query.bind(limit as u64).fetch_all(&self.pool).await?;

        debug!(
            "Read {} rows from {} after key {:?}",
            rows.len(),
            self.table,
            after_key
        );
        let values = rows
            .iter()
            .map(Self::row_to_values)
            .collect::<Result<Vec<_>>>()?;
        Ok(Batch::new(values))
    }

    async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL source connection"))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
