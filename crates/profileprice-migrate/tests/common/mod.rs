//! In-memory stores for driving the orchestrator without databases.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use profileprice_migrate::core::schema::{KEY_POSITION, WINDOW_COLUMN};
use profileprice_migrate::core::schema::column_index;
use profileprice_migrate::{
    AnalyticalConfig, AnalyticalWriter, Batch, Config, DatabaseConfig, MigrateError,
    MigrationConfig, MigrationWindow, Orchestrator, PriceRecord, RelationalWriter, Result, Row,
    SourceReader, SqlValue,
};

pub fn jan_2024(seconds: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::seconds(seconds)
}

/// A raw source row as the MySQL reader would produce it.
pub fn price_row(id: i64) -> Row {
    vec![
        SqlValue::I64(id),
        SqlValue::F64(9.99),
        SqlValue::DateTime(jan_2024(id)),
        SqlValue::I32(1),
        SqlValue::F64(19.0),
        SqlValue::Null,
        SqlValue::F64(1.0),
        SqlValue::Text("EUR".into()),
        SqlValue::I64(id % 100),
        SqlValue::Null,
        SqlValue::Text("ACME".into()),
        SqlValue::Null,
        SqlValue::I64(7),
        SqlValue::Null,
        SqlValue::F64(8.5),
        SqlValue::I64(id),
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::DateTime(jan_2024(id)),
    ]
}

pub fn price_rows(count: i64) -> Vec<Row> {
    (1..=count).map(price_row).collect()
}

fn key_of(row: &Row) -> i64 {
    match row[KEY_POSITION] {
        SqlValue::I64(k) => k,
        _ => panic!("test rows carry I64 keys"),
    }
}

fn in_window(row: &Row, window: &MigrationWindow) -> bool {
    let idx = column_index(WINDOW_COLUMN).unwrap();
    match &row[idx] {
        SqlValue::DateTime(ts) => window.contains(ts),
        _ => false,
    }
}

/// Source table held in memory, sorted by key.
#[derive(Default)]
pub struct MemorySource {
    rows: Vec<Row>,
    pub read_calls: AtomicUsize,
    pub closed: AtomicBool,
    pub fail_count: AtomicBool,
}

impl MemorySource {
    pub fn new(mut rows: Vec<Row>) -> Self {
        rows.sort_by_key(key_of);
        Self {
            rows,
            ..Default::default()
        }
    }

    fn matching<'a>(
        &'a self,
        window: &'a MigrationWindow,
        after_key: Option<i64>,
    ) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows
            .iter()
            .filter(move |r| in_window(r, window))
            .filter(move |r| after_key.map_or(true, |k| key_of(r) > k))
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn count_rows(&self, window: &MigrationWindow, after_key: Option<i64>) -> Result<i64> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(MigrateError::Config("source count failed".into()));
        }
        Ok(self.matching(window, after_key).count() as i64)
    }

    async fn read_batch(
        &self,
        window: &MigrationWindow,
        after_key: Option<i64>,
        limit: usize,
    ) -> Result<Batch> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Batch::new(
            self.matching(window, after_key).take(limit).cloned().collect(),
        ))
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Relational destination held in memory.
#[derive(Default)]
pub struct MemoryRelational {
    pub rows: Mutex<Vec<Row>>,
    pub batches: AtomicUsize,
    pub row_count_calls: AtomicUsize,
    pub closed: AtomicBool,
    pub fail_row_count: AtomicBool,
}

impl MemoryRelational {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<i64> {
        let mut keys: Vec<i64> = self.rows.lock().unwrap().iter().map(key_of).collect();
        keys.sort_unstable();
        keys
    }
}

#[async_trait]
impl RelationalWriter for MemoryRelational {
    async fn row_count(&self) -> Result<i64> {
        self.row_count_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_row_count.load(Ordering::SeqCst) {
            return Err(MigrateError::Config("relational count failed".into()));
        }
        Ok(self.len() as i64)
    }

    async fn write_batch(&self, rows: &[Row]) -> Result<u64> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().unwrap().extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn delete_key_range(&self, after_key: Option<i64>, up_to_key: i64) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| {
            let k = key_of(r);
            !(after_key.map_or(true, |a| k > a) && k <= up_to_key)
        });
        Ok((before - rows.len()) as u64)
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Analytical destination held in memory.
pub struct MemoryAnalytical {
    pub records: Mutex<Vec<PriceRecord>>,
    pub batches: AtomicUsize,
    pub ping_calls: AtomicU32,
    /// Pings that fail before the first success.
    pub ping_failures: AtomicU32,
    pub table_exists: AtomicBool,
    pub fail_table_exists: AtomicBool,
    pub fail_row_count: AtomicBool,
    /// Fail the write of this batch number (1-based); 0 never fails.
    pub fail_on_batch: AtomicUsize,
    pub closed: AtomicBool,
}

impl Default for MemoryAnalytical {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            batches: AtomicUsize::new(0),
            ping_calls: AtomicU32::new(0),
            ping_failures: AtomicU32::new(0),
            table_exists: AtomicBool::new(true),
            fail_table_exists: AtomicBool::new(false),
            fail_row_count: AtomicBool::new(false),
            fail_on_batch: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }
}

impl MemoryAnalytical {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<i64> {
        let mut keys: Vec<i64> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.price_id)
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn preload(&self, record: PriceRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[async_trait]
impl AnalyticalWriter for MemoryAnalytical {
    async fn ping(&self) -> Result<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.ping_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.ping_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MigrateError::Config("connection refused".into()));
        }
        Ok(())
    }

    async fn table_exists(&self) -> Result<bool> {
        if self.fail_table_exists.load(Ordering::SeqCst) {
            return Err(MigrateError::Config("system.tables query failed".into()));
        }
        Ok(self.table_exists.load(Ordering::SeqCst))
    }

    async fn row_count(&self) -> Result<i64> {
        if self.fail_row_count.load(Ordering::SeqCst) {
            return Err(MigrateError::Config("analytical count failed".into()));
        }
        Ok(self.len() as i64)
    }

    async fn write_batch(&self, records: &[PriceRecord]) -> Result<u64> {
        let batch = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_batch.load(Ordering::SeqCst) == batch {
            return Err(MigrateError::transfer("PROFILEPRICE", "analytical insert failed"));
        }
        self.records.lock().unwrap().extend(records.iter().cloned());
        Ok(records.len() as u64)
    }

    async fn delete_key_range(&self, after_key: Option<i64>, up_to_key: i64) -> Result<()> {
        self.records.lock().unwrap().retain(|r| {
            let k = r.price_id;
            !(after_key.map_or(true, |a| k > a) && k <= up_to_key)
        });
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn test_config() -> Config {
    Config {
        source: DatabaseConfig {
            host: "legacy-db".into(),
            port: 3306,
            database: "legacy".into(),
            user: "reader".into(),
            password: "pw".into(),
        },
        relational: DatabaseConfig {
            host: "mariadb".into(),
            port: 3306,
            database: "prices".into(),
            user: "writer".into(),
            password: "pw".into(),
        },
        analytical: AnalyticalConfig {
            host: "clickhouse".into(),
            port: 8123,
            database: "analytics".into(),
            user: "default".into(),
            password: "pw".into(),
        },
        migration: MigrationConfig::default(),
    }
}

/// The three stores plus an orchestrator over them.
pub struct Harness {
    pub source: Arc<MemorySource>,
    pub relational: Arc<MemoryRelational>,
    pub analytical: Arc<MemoryAnalytical>,
}

impl Harness {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            source: Arc::new(MemorySource::new(rows)),
            relational: Arc::new(MemoryRelational::default()),
            analytical: Arc::new(MemoryAnalytical::default()),
        }
    }

    pub fn orchestrator(&self, config: Config) -> Orchestrator {
        Orchestrator::new(
            config,
            self.source.clone(),
            self.relational.clone(),
            self.analytical.clone(),
        )
    }

    pub fn all_closed(&self) -> bool {
        self.source.closed.load(Ordering::SeqCst)
            && self.relational.closed.load(Ordering::SeqCst)
            && self.analytical.closed.load(Ordering::SeqCst)
    }
}
