//! Batch transfer engine.
//!
//! Pages through the source table with keyset pagination on the key column,
//! converts each row, type-checks the batch into analytical records and then
//! writes it to the relational destination (one transaction) followed by the
//! analytical destination. Everything runs sequentially on the caller's task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::convert::{convert_row, convert_value};
use crate::core::record::PriceRecord;
use crate::core::schema::{MigrationWindow, KEY_COLUMN, KEY_POSITION};
use crate::core::traits::{AnalyticalWriter, RelationalWriter, SourceReader};
use crate::core::value::{display_row, Row, SqlValue};
use crate::error::{MigrateError, Result};
use crate::progress::{ProgressTracker, DEFAULT_PROGRESS_INTERVAL};
use crate::state::{Checkpointer, StagedBatch};

/// Transfer engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Table name, used in log lines and errors.
    pub table: String,
    /// Number of rows per page.
    pub batch_size: usize,
    /// `[start, end)` filter on the window column.
    pub window: MigrationWindow,
    /// Minimum time between progress lines.
    pub progress_interval: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            table: crate::core::schema::DEFAULT_TABLE.to_string(),
            batch_size: 10_000,
            window: MigrationWindow::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Where a transfer starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferJob {
    /// Only rows with a key greater than this are read.
    pub resume_after: Option<i64>,

    /// Rows expected past `resume_after`, for progress reporting.
    pub rows_total: u64,
}

/// Statistics from a transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferStats {
    /// Rows returned by the source.
    pub rows_read: u64,

    /// Rows written to each destination.
    pub rows_written: u64,

    /// Rows dropped because a cell could not be converted.
    pub rows_skipped: u64,

    /// Pages read, including pages whose rows were all skipped.
    pub batches: u64,

    /// Key of the last row read.
    pub last_key: Option<i64>,

    /// Time spent reading from the source.
    pub read_time: Duration,

    /// Time spent writing to both destinations.
    pub write_time: Duration,
}

/// Transfer engine for moving rows into both destinations.
pub struct TransferEngine {
    source: Arc<dyn SourceReader>,
    relational: Arc<dyn RelationalWriter>,
    analytical: Arc<dyn AnalyticalWriter>,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(
        source: Arc<dyn SourceReader>,
        relational: Arc<dyn RelationalWriter>,
        analytical: Arc<dyn AnalyticalWriter>,
        config: TransferConfig,
    ) -> Self {
        Self {
            source,
            relational,
            analytical,
            config,
        }
    }

    /// Copy every row of the window past `job.resume_after`.
    pub async fn execute(
        &self,
        job: TransferJob,
        checkpoint: &mut Checkpointer,
    ) -> Result<TransferStats> {
        let table = &self.config.table;
        info!(
            "Starting transfer for {} ({} rows, batch size {})",
            table, job.rows_total, self.config.batch_size
        );

        let mut stats = TransferStats::default();
        let mut progress =
            ProgressTracker::with_interval(job.rows_total, self.config.progress_interval);
        let mut cursor = job.resume_after;

        loop {
            let read_start = Instant::now();
            let batch = self
                .source
                .read_batch(&self.config.window, cursor, self.config.batch_size)
                .await?;
            stats.read_time += read_start.elapsed();

            let fetched = batch.len();
            if fetched == 0 {
                break;
            }

            let last_key = batch
                .rows
                .last()
                .and_then(|row| row_key(row))
                .ok_or_else(|| {
                    MigrateError::transfer(
                        table,
                        format!("cannot read {} of the last row after key {:?}", KEY_COLUMN, cursor),
                    )
                })?;
            let first_key = batch.rows.iter().find_map(|row| row_key(row)).unwrap_or(last_key);

            progress.update(fetched as u64);
            let offset = stats.rows_read;
            stats.rows_read += fetched as u64;
            stats.batches += 1;

            let rows = convert_batch(batch.rows, offset);
            let skipped = fetched - rows.len();
            stats.rows_skipped += skipped as u64;

            // Type check the whole batch before touching either destination
            let records = rows
                .iter()
                .map(|row| PriceRecord::from_row(row))
                .collect::<Result<Vec<_>>>()?;

            if rows.is_empty() {
                debug!("{}: batch after {:?} had no convertible rows", table, cursor);
                checkpoint.advance(last_key, fetched, skipped)?;
            } else {
                let write_start = Instant::now();
                checkpoint.stage(StagedBatch {
                    first_key,
                    last_key,
                    rows: rows.len(),
                })?;

                self.relational.write_batch(&rows).await?;
                checkpoint.relational_done(last_key)?;

                let written = self.analytical.write_batch(&records).await?;
                checkpoint.analytical_done(last_key, fetched, written, skipped)?;

                stats.rows_written += written;
                stats.write_time += write_start.elapsed();
            }

            debug!(
                "{}: batch {} keys {}..={} read {} skipped {}",
                table, stats.batches, first_key, last_key, fetched, skipped
            );

            stats.last_key = Some(last_key);
            cursor = Some(last_key);

            if fetched < self.config.batch_size {
                break;
            }
        }

        progress.print_progress();
        info!(
            "{}: transferred {} rows in {} batches ({} skipped, read: {:?}, write: {:?})",
            table,
            stats.rows_written,
            stats.batches,
            stats.rows_skipped,
            stats.read_time,
            stats.write_time
        );

        Ok(stats)
    }
}

/// Key of a raw source row, if it converts to an integer.
fn row_key(row: &[SqlValue]) -> Option<i64> {
    let cell = row.get(KEY_POSITION)?;
    if cell.is_null() {
        return None;
    }
    match convert_value(cell.clone(), KEY_COLUMN) {
        Ok(SqlValue::I64(key)) => Some(key),
        _ => None,
    }
}

/// Convert every row, dropping (and logging) the ones that fail. `offset`
/// is the number of rows read before this batch.
fn convert_batch(raw_rows: Vec<Row>, offset: u64) -> Vec<Row> {
    let mut converted = Vec::with_capacity(raw_rows.len());
    for (index, raw) in raw_rows.into_iter().enumerate() {
        let shown = display_row(&raw);
        match convert_row(raw) {
            Ok(row) => converted.push(row),
            Err(e) => warn!(
                "Skipping row {}: {} | raw row: {}",
                offset + index as u64,
                e,
                shown
            ),
        }
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::COLUMN_COUNT;

    fn raw_row(key: SqlValue) -> Row {
        let mut row = vec![SqlValue::Null; COLUMN_COUNT];
        row[KEY_POSITION] = key;
        row
    }

    #[test]
    fn test_row_key() {
        assert_eq!(row_key(&raw_row(SqlValue::I64(42))), Some(42));
        assert_eq!(row_key(&raw_row(SqlValue::I32(7))), Some(7));
        assert_eq!(row_key(&raw_row(SqlValue::Text(" 9 ".into()))), Some(9));
        assert_eq!(row_key(&raw_row(SqlValue::Text("abc".into()))), None);
        assert_eq!(row_key(&raw_row(SqlValue::Null)), None);
        assert_eq!(row_key(&[]), None);
    }

    #[test]
    fn test_convert_batch_drops_bad_rows() {
        let mut bad = raw_row(SqlValue::I64(2));
        bad[3] = SqlValue::Text("not a number".into());

        let rows = vec![raw_row(SqlValue::I64(1)), bad, raw_row(SqlValue::I64(3))];
        let converted = convert_batch(rows, 100);

        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0][KEY_POSITION], SqlValue::I64(1));
        assert_eq!(converted[1][KEY_POSITION], SqlValue::I64(3));
    }

    #[test]
    fn test_convert_batch_drops_short_rows() {
        let rows = vec![vec![SqlValue::I64(1)]];
        assert!(convert_batch(rows, 0).is_empty());
    }
}
