//! ClickHouse analytical writer implementation.

use async_trait::async_trait;
use clickhouse::Client;
use tracing::{debug, info};

use crate::config::AnalyticalConfig;
use crate::core::record::PriceRecord;
use crate::core::schema::KEY_COLUMN;
use crate::core::traits::AnalyticalWriter;
use crate::error::Result;

/// ClickHouse writer over the HTTP interface.
///
/// The client is stateless; nothing is sent until the first query, so
/// construction never fails on an unreachable server.
pub struct ClickhouseWriter {
    client: Client,
    table: String,
}

impl ClickhouseWriter {
    pub fn new(config: &AnalyticalConfig, table: &str) -> Self {
        let client = Client::default()
            .with_url(config.url())
            .with_user(&config.user)
            .with_password(&config.password)
            .with_database(&config.database);

        info!(
            "Configured ClickHouse target: {}/{}",
            config.url(),
            config.database
        );

        Self {
            client,
            table: table.to_string(),
        }
    }
}

/// Lightweight-delete mutation for a key range, waiting on all replicas.
pub(crate) fn build_delete_sql(table: &str, with_lower_bound: bool) -> String {
    if with_lower_bound {
        format!(
            "ALTER TABLE `{}` DELETE WHERE {} > ? AND {} <= ?",
            table, KEY_COLUMN, KEY_COLUMN
        )
    } else {
        format!("ALTER TABLE `{}` DELETE WHERE {} <= ?", table, KEY_COLUMN)
    }
}

#[async_trait]
impl AnalyticalWriter for ClickhouseWriter {
    async fn ping(&self) -> Result<()> {
        let _: u8 = self.client.query("SELECT 1").fetch_one().await?;
        Ok(())
    }

    async fn table_exists(&self) -> Result<bool> {
        let count: u64 = self
            .client
            .query("SELECT count() FROM system.tables WHERE database = currentDatabase() AND name = ?")
            .bind(self.table.as_str())
            .fetch_one()
            .await?;
        Ok(count > 0)
    }

    async fn row_count(&self) -> Result<i64> {
        let sql = format!("SELECT count() FROM `{}`", self.table);
        let count: u64 = self.client.query(&sql).fetch_one().await?;
        Ok(count as i64)
    }

    async fn write_batch(&self, records: &[PriceRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut insert = self.client.insert::<PriceRecord>(&self.table)?;
        for record in records {
            insert.write(record).await?;
        }
        insert.end().await?;

        debug!("ClickHouse: wrote {} rows to {}", records.len(), self.table);
        Ok(records.len() as u64)
    }

    async fn delete_key_range(&self, after_key: Option<i64>, up_to_key: i64) -> Result<()> {
        let sql = build_delete_sql(&self.table, after_key.is_some());
        let client = self.client.clone().with_option("mutations_sync", "2");
        let mut query = client.query(&sql);
        if let Some(after) = after_key {
            query = query.bind(after);
        }
        query.bind(up_to_key).execute().await?;

        debug!(
            "ClickHouse: deleted rows from {} in ({:?}, {}]",
            self.table, after_key, up_to_key
        );
        Ok(())
    }

    async fn close(&self) {
        debug!("ClickHouse: releasing client for {}", self.table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_sql() {
        assert_eq!(
            build_delete_sql("PROFILEPRICE", true),
            "ALTER TABLE `PROFILEPRICE` DELETE WHERE PRICEID > ? AND PRICEID <= ?"
        );
        assert_eq!(
            build_delete_sql("PROFILEPRICE", false),
            "ALTER TABLE `PROFILEPRICE` DELETE WHERE PRICEID <= ?"
        );
    }

    #[test]
    fn test_new_does_not_connect() {
        let config = AnalyticalConfig {
            host: "127.0.0.1".into(),
            port: 1,
            database: "analytics".into(),
            user: "default".into(),
            password: String::new(),
        };
        let writer = ClickhouseWriter::new(&config, "PROFILEPRICE");
        assert_eq!(writer.table, "PROFILEPRICE");
    }
}
