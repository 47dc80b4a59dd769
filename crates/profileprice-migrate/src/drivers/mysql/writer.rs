//! MariaDB relational target writer implementation.
//!
//! Implements the `RelationalWriter` trait for the relational copy of the table.
//! Uses mysql_async for connection pooling and batched INSERT inside one
//! transaction per batch.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use mysql_async::prelude::*;
use mysql_async::{Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, TxOpts};
use tracing::{debug, info};

use super::quote_ident;
use crate::config::DatabaseConfig;
use crate::core::schema::{column_names, COLUMN_COUNT, KEY_COLUMN};
use crate::core::traits::RelationalWriter;
use crate::core::value::{Row, SqlValue};
use crate::error::{MigrateError, Result};

/// MySQL max placeholders per prepared statement.
const MYSQL_MAX_PLACEHOLDERS: usize = 65535;

/// MariaDB target writer implementation using mysql_async.
pub struct MysqlWriter {
    pool: Pool,
    table: String,
}

impl MysqlWriter {
    /// Connect to the relational destination.
    pub async fn new(config: &DatabaseConfig, table: &str) -> Result<Self> {
        let builder = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port)
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        let constraints = PoolConstraints::new(1, 1)
            .ok_or_else(|| MigrateError::pool("invalid pool constraints", "creating MariaDB pool"))?;
        let pool_opts = PoolOpts::new().with_constraints(constraints);

        let opts: Opts = builder.pool_opts(pool_opts).into();
        let pool = Pool::new(opts);

        // Test connection
        let mut conn = pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::pool(e, "creating MariaDB target pool"))?;

        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| MigrateError::pool(e, "testing MariaDB target connection"))?;

        drop(conn);

        info!(
            "Connected to MariaDB target: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

/// Multi-row INSERT for `rows` rows of the migrated columns.
pub(crate) fn build_insert_sql(table: &str, rows: usize) -> String {
    let col_list: Vec<String> = column_names().map(quote_ident).collect();
    let placeholders_per_row = format!("({})", vec!["?"; COLUMN_COUNT].join(", "));
    let all_placeholders: Vec<String> = std::iter::repeat_n(placeholders_per_row, rows).collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        col_list.join(", "),
        all_placeholders.join(", ")
    )
}

/// DELETE of a half-open key range.
pub(crate) fn build_delete_sql(table: &str, with_lower_bound: bool) -> String {
    let key = quote_ident(KEY_COLUMN);
    if with_lower_bound {
        format!(
            "DELETE FROM {} WHERE {} > ? AND {} <= ?",
            quote_ident(table),
            key,
            key
        )
    } else {
        format!("DELETE FROM {} WHERE {} <= ?", quote_ident(table), key)
    }
}

#[async_trait]
impl RelationalWriter for MysqlWriter {
    async fn row_count(&self) -> Result<i64> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::pool(e, "getting MariaDB connection"))?;

        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table));
        let count: Option<i64> = conn.query_first(&sql).await?;
        Ok(count.unwrap_or(0))
    }

    async fn write_batch(&self, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::pool(e, "getting MariaDB connection"))?;

        let mut tx = conn.start_transaction(TxOpts::default()).await?;

        // Rollback happens when tx is dropped without commit
        for chunk in rows.chunks(MYSQL_MAX_PLACEHOLDERS / COLUMN_COUNT) {
            let sql = build_insert_sql(&self.table, chunk.len());
            let params: Vec<mysql_async::Value> = chunk
                .iter()
                .flat_map(|row| row.iter().map(sql_value_to_mysql))
                .collect();

            tx.exec_drop(&sql, params).await.map_err(|e| {
                MigrateError::transfer(&self.table, format!("INSERT batch: {}", e))
            })?;
        }

        tx.commit().await?;

        debug!("MariaDB: wrote {} rows to {}", rows.len(), self.table);
        Ok(rows.len() as u64)
    }

    async fn delete_key_range(&self, after_key: Option<i64>, up_to_key: i64) -> Result<u64> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::pool(e, "getting MariaDB connection"))?;

        let sql = build_delete_sql(&self.table, after_key.is_some());
        match after_key {
            Some(after) => conn.exec_drop(&sql, (after, up_to_key)).await?,
            None => conn.exec_drop(&sql, (up_to_key,)).await?,
        }

        let deleted = conn.affected_rows();
        debug!(
            "MariaDB: deleted {} rows from {} in ({:?}, {}]",
            deleted, self.table, after_key, up_to_key
        );
        Ok(deleted)
    }

    async fn test_connection(&self) -> Result<()> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::pool(e, "testing MariaDB connection"))?;
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| MigrateError::pool(e, "testing MariaDB connection"))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.clone().disconnect().await.ok();
    }
}

/// Convert SqlValue to mysql_async::Value.
fn sql_value_to_mysql(value: &SqlValue) -> mysql_async::Value {
    match value {
        SqlValue::Null => mysql_async::Value::NULL,
        SqlValue::Bool(b) => mysql_async::Value::from(*b),
        SqlValue::I16(i) => mysql_async::Value::from(*i),
        SqlValue::I32(i) => mysql_async::Value::from(*i),
        SqlValue::I64(i) => mysql_async::Value::from(*i),
        SqlValue::F32(f) => mysql_async::Value::from(*f),
        SqlValue::F64(f) => mysql_async::Value::from(*f),
        SqlValue::Text(s) => mysql_async::Value::from(s.as_str()),
        SqlValue::Bytes(b) => mysql_async::Value::from(b.as_slice()),
        SqlValue::Decimal(d) => mysql_async::Value::from(d.to_string()),
        SqlValue::DateTime(dt) => datetime_value(dt),
        SqlValue::Date(d) => date_value(d),
        SqlValue::Time(t) => time_value(t),
    }
}

fn datetime_value(dt: &NaiveDateTime) -> mysql_async::Value {
    mysql_async::Value::Date(
        dt.year() as u16,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
        dt.nanosecond() / 1_000,
    )
}

fn date_value(d: &NaiveDate) -> mysql_async::Value {
    mysql_async::Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
}

fn time_value(t: &NaiveTime) -> mysql_async::Value {
    mysql_async::Value::Time(
        false,
        0,
        t.hour() as u8,
        t.minute() as u8,
        t.second() as u8,
        t.nanosecond() / 1_000,
    )
}
