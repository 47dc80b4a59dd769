//! Store traits used by the migration engine.
//!
//! - [`SourceReader`]: counts and pages rows out of the source table
//! - [`RelationalWriter`]: transactional batch writes to the relational destination
//! - [`AnalyticalWriter`]: bulk writes to the analytical destination
//!
//! Drivers in [`crate::drivers`] implement these for MySQL/MariaDB and
//! ClickHouse; tests implement them in memory.

use async_trait::async_trait;

use crate::core::record::PriceRecord;
use crate::core::schema::MigrationWindow;
use crate::core::value::{Batch, Row};
use crate::error::Result;

/// Read rows from the source table.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Count rows inside `window` whose key is greater than `after_key`.
    async fn count_rows(&self, window: &MigrationWindow, after_key: Option<i64>) -> Result<i64>;

    /// Read up to `limit` rows inside `window` with key greater than
    /// `after_key`, ordered by key.
    async fn read_batch(
        &self,
        window: &MigrationWindow,
        after_key: Option<i64>,
        limit: usize,
    ) -> Result<Batch>;

    /// Run a trivial query.
    async fn test_connection(&self) -> Result<()>;

    /// Close the connection pool.
    async fn close(&self);
}

/// Write rows to the relational destination.
#[async_trait]
pub trait RelationalWriter: Send + Sync {
    /// Number of rows in the destination table.
    async fn row_count(&self) -> Result<i64>;

    /// Insert a batch of converted rows and commit it as one transaction.
    async fn write_batch(&self, rows: &[Row]) -> Result<u64>;

    /// Delete rows with `after_key < key <= up_to_key` (no lower bound when
    /// `after_key` is `None`).
    async fn delete_key_range(&self, after_key: Option<i64>, up_to_key: i64) -> Result<u64>;

    /// Run a trivial query.
    async fn test_connection(&self) -> Result<()>;

    /// Close the connection pool.
    async fn close(&self);
}

/// Write rows to the analytical destination.
#[async_trait]
pub trait AnalyticalWriter: Send + Sync {
    /// Liveness probe (`SELECT 1`).
    async fn ping(&self) -> Result<()>;

    /// Whether the destination table exists.
    async fn table_exists(&self) -> Result<bool>;

    /// Number of rows in the destination table.
    async fn row_count(&self) -> Result<i64>;

    /// Bulk insert typed records.
    async fn write_batch(&self, records: &[PriceRecord]) -> Result<u64>;

    /// Delete rows with `after_key < key <= up_to_key`.
    async fn delete_key_range(&self, after_key: Option<i64>, up_to_key: i64) -> Result<()>;

    /// Release the client.
    async fn close(&self);
}
