//! Migration orchestrator - main workflow coordinator.
//!
//! Runs readiness, existence and emptiness checks, counts the window and
//! hands over to the [`TransferEngine`]. All three store handles are closed
//! when the orchestrator finishes, whatever the outcome.

pub mod guards;

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::traits::{AnalyticalWriter, RelationalWriter, SourceReader};
use crate::drivers::{ClickhouseWriter, MysqlReader, MysqlWriter};
use crate::error::{MigrateError, Result};
use crate::state::{Checkpointer, MigrationState, RunStatus};
use crate::transfer::{TransferConfig, TransferEngine, TransferJob, TransferStats};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    state_file: Option<PathBuf>,
    state: Option<MigrationState>,
    source: Arc<dyn SourceReader>,
    relational: Arc<dyn RelationalWriter>,
    analytical: Arc<dyn AnalyticalWriter>,
}

/// How a run ended without an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "details", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Rows were copied.
    Completed(MigrationResult),

    /// Nothing was written.
    Skipped(SkipReason),
}

/// Why a run wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AnalyticalNotEmpty,
    RelationalNotEmpty,
    AlreadyCompleted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AnalyticalNotEmpty => write!(f, "analytical target already contains data"),
            SkipReason::RelationalNotEmpty => write!(f, "relational target already contains data"),
            SkipReason::AlreadyCompleted => write!(f, "state file records a completed run"),
        }
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Whether this run continued an interrupted one.
    pub resumed: bool,

    /// Duration of this invocation in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Rows in the window when the migration started.
    pub rows_total: i64,

    /// Rows read from the source.
    pub rows_read: i64,

    /// Rows written to each destination.
    pub rows_written: i64,

    /// Rows dropped by the converter.
    pub rows_skipped: i64,

    /// Batches processed.
    pub batches: u64,

    /// Average write throughput of this invocation (rows/second).
    pub rows_per_second: i64,

    /// Share of the window read, in percent.
    pub completion_percent: f64,
}

/// Row counts of the three stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub table: String,
    /// Rows in the migration window of the source.
    pub source_rows: i64,
    pub relational_rows: i64,
    pub analytical_rows: i64,
    /// Both destinations hold exactly the source window count.
    pub matches: bool,
}

/// Connectivity of one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHealth {
    pub connected: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Result of probing all three stores once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source: StoreHealth,
    pub relational: StoreHealth,
    pub analytical: StoreHealth,
    pub healthy: bool,
}

impl Orchestrator {
    /// Create an orchestrator over already-built store handles.
    pub fn new(
        config: Config,
        source: Arc<dyn SourceReader>,
        relational: Arc<dyn RelationalWriter>,
        analytical: Arc<dyn AnalyticalWriter>,
    ) -> Self {
        Self {
            config,
            state_file: None,
            state: None,
            source,
            relational,
            analytical,
        }
    }

    /// Connect to the source and both destinations.
    pub async fn connect(config: Config) -> Result<Self> {
        let table = config.migration.table.clone();

        let source = MysqlReader::new(&config.source, &table).await?;
        let relational = match MysqlWriter::new(&config.relational, &table).await {
            Ok(writer) => writer,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };
        let analytical = ClickhouseWriter::new(&config.analytical, &table);

        Ok(Self::new(
            config,
            Arc::new(source),
            Arc::new(relational),
            Arc::new(analytical),
        ))
    }

    /// Set the state file path for resume capability.
    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        self.state_file = Some(path);
        self
    }

    /// Load existing state for resume.
    pub fn resume(mut self) -> Result<Self> {
        if let Some(ref path) = self.state_file {
            if path.exists() {
                let state = MigrationState::load(path)?;
                state.validate_config(&self.config.hash())?;
                info!("Resuming from state file: {:?}", path);
                self.state = Some(state);
            } else {
                warn!("No state file at {:?}, starting a fresh run", path);
            }
        }
        Ok(self)
    }

    /// Run the migration. Store handles are closed before returning.
    pub async fn run(mut self) -> Result<MigrationOutcome> {
        let result = self.execute().await;
        if let Err(ref e) = result {
            error!("Migration failed: {}", e);
        }
        self.close().await;
        result
    }

    async fn execute(&mut self) -> Result<MigrationOutcome> {
        let started_at = Utc::now();
        let start = Instant::now();
        let migration = &self.config.migration;
        let table = migration.table.clone();

        if self.state.as_ref().is_some_and(MigrationState::is_completed) {
            info!("Migration of {} already completed, nothing to resume", table);
            return Ok(MigrationOutcome::Skipped(SkipReason::AlreadyCompleted));
        }
        let resuming = self.state.is_some();

        info!("Waiting for analytical store");
        if !guards::wait_for_ready(
            &*self.analytical,
            migration.readiness_attempts,
            migration.readiness_delay(),
        )
        .await
        {
            return Err(MigrateError::ReadinessTimeout {
                attempts: migration.readiness_attempts,
            });
        }

        if !guards::table_exists(&*self.analytical).await {
            return Err(MigrateError::TableMissing(table));
        }

        if !resuming {
            let policy = migration.guard_error_policy;
            if !guards::is_analytical_target_empty(&*self.analytical, policy).await? {
                info!("Analytical target already contains data, skipping migration");
                return Ok(MigrationOutcome::Skipped(SkipReason::AnalyticalNotEmpty));
            }
            if !guards::is_relational_target_empty(&*self.relational, policy).await? {
                info!("Relational target already contains data, skipping migration");
                return Ok(MigrationOutcome::Skipped(SkipReason::RelationalNotEmpty));
            }
        }

        let mut state = match self.state.take() {
            Some(mut state) => {
                self.reconcile(&mut state).await?;
                state
            }
            None => MigrationState::new(
                uuid::Uuid::new_v4().to_string(),
                self.config.hash(),
                &table,
                0,
            ),
        };

        let resume_after = state.analytical_last_key;
        let rows_to_read = self
            .source
            .count_rows(&migration.window, resume_after)
            .await?;
        if !resuming {
            state.rows_total = rows_to_read;
        }
        state.status = RunStatus::Running;
        state.error = None;

        info!(
            "Starting migration run {}: {} rows to migrate from {}",
            state.run_id, rows_to_read, table
        );

        let mut checkpoint = Checkpointer::new(state, self.state_file.clone());
        checkpoint.save()?;

        let engine = TransferEngine::new(
            self.source.clone(),
            self.relational.clone(),
            self.analytical.clone(),
            TransferConfig {
                table: table.clone(),
                batch_size: migration.batch_size,
                window: migration.window,
                progress_interval: migration.progress_interval(),
            },
        );

        let job = TransferJob {
            resume_after,
            rows_total: rows_to_read.max(0) as u64,
        };
        let stats = match engine.execute(job, &mut checkpoint).await {
            Ok(stats) => stats,
            Err(e) => {
                let message = e.to_string();
                if let Err(save_err) = checkpoint.update(|s| s.mark_failed(&message)) {
                    warn!("Failed to record failure in state file: {}", save_err);
                }
                return Err(e);
            }
        };

        checkpoint.update(MigrationState::mark_completed)?;
        let result = build_result(checkpoint.state(), &stats, resuming, started_at, start);

        info!(
            "Migration complete: {} rows written, {} skipped, {} batches in {:.1}s",
            result.rows_written, result.rows_skipped, result.batches, result.duration_seconds
        );
        Ok(MigrationOutcome::Completed(result))
    }

    /// Remove rows that may have reached only one destination.
    async fn reconcile(&self, state: &mut MigrationState) -> Result<()> {
        if let Some((after_key, up_to_key)) = state.pending_range() {
            warn!(
                "Removing partially written keys in ({:?}, {}] from both targets",
                after_key, up_to_key
            );
            let deleted = self
                .relational
                .delete_key_range(after_key, up_to_key)
                .await?;
            self.analytical
                .delete_key_range(after_key, up_to_key)
                .await?;
            info!("Removed {} rows from relational target", deleted);
        }
        state.relational_last_key = state.analytical_last_key;
        state.staged = None;
        Ok(())
    }

    /// Compare the source window count with both destination counts.
    pub async fn validate(self) -> Result<ValidationReport> {
        let result = self.count_all().await;
        self.close().await;
        result
    }

    async fn count_all(&self) -> Result<ValidationReport> {
        let table = self.config.migration.table.clone();
        let source_rows = self
            .source
            .count_rows(&self.config.migration.window, None)
            .await?;
        let relational_rows = self.relational.row_count().await?;
        let analytical_rows = self.analytical.row_count().await?;
        let matches = source_rows == relational_rows && source_rows == analytical_rows;

        if matches {
            info!("{}: {} rows (match)", table, source_rows);
        } else {
            warn!(
                "{}: source={} relational={} analytical={} (MISMATCH)",
                table, source_rows, relational_rows, analytical_rows
            );
        }

        Ok(ValidationReport {
            table,
            source_rows,
            relational_rows,
            analytical_rows,
            matches,
        })
    }

    /// Probe each store once.
    pub async fn health_check(self) -> HealthCheckResult {
        let source = timed(self.source.test_connection()).await;
        let relational = timed(self.relational.test_connection()).await;
        let analytical = timed(self.analytical.ping()).await;
        self.close().await;

        HealthCheckResult::new(source, relational, analytical)
    }

    /// Connect to and check each store independently. A store that cannot be
    /// reached is reported as such instead of failing the whole check.
    pub async fn check_health(config: &Config) -> HealthCheckResult {
        let table = config.migration.table.as_str();

        let source = timed(async {
            let reader = MysqlReader::new(&config.source, table).await?;
            let result = reader.test_connection().await;
            reader.close().await;
            result
        })
        .await;

        let relational = timed(async {
            let writer = MysqlWriter::new(&config.relational, table).await?;
            let result = writer.test_connection().await;
            writer.close().await;
            result
        })
        .await;

        let analytical = timed(ClickhouseWriter::new(&config.analytical, table).ping()).await;

        HealthCheckResult::new(source, relational, analytical)
    }

    async fn close(&self) {
        self.source.close().await;
        self.relational.close().await;
        self.analytical.close().await;
    }
}

impl HealthCheckResult {
    fn new(source: StoreHealth, relational: StoreHealth, analytical: StoreHealth) -> Self {
        let healthy = source.connected && relational.connected && analytical.connected;
        Self {
            source,
            relational,
            analytical,
            healthy,
        }
    }
}

async fn timed<F>(check: F) -> StoreHealth
where
    F: Future<Output = Result<()>>,
{
    let start = Instant::now();
    store_health(check.await, start)
}

fn store_health(result: Result<()>, start: Instant) -> StoreHealth {
    let latency_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(()) => StoreHealth {
            connected: true,
            latency_ms,
            error: None,
        },
        Err(e) => StoreHealth {
            connected: false,
            latency_ms,
            error: Some(e.to_string()),
        },
    }
}

fn build_result(
    state: &MigrationState,
    stats: &TransferStats,
    resumed: bool,
    started_at: DateTime<Utc>,
    start: Instant,
) -> MigrationResult {
    let duration = start.elapsed().as_secs_f64();
    let rows_per_second = if duration > 0.0 {
        (stats.rows_written as f64 / duration) as i64
    } else {
        0
    };
    let completion_percent = if state.rows_total <= 0 {
        100.0
    } else {
        (state.rows_read as f64 / state.rows_total as f64 * 100.0).min(100.0)
    };

    MigrationResult {
        run_id: state.run_id.clone(),
        status: "completed".to_string(),
        resumed,
        duration_seconds: duration,
        started_at,
        completed_at: state.completed_at.unwrap_or_else(Utc::now),
        rows_total: state.rows_total,
        rows_read: state.rows_read,
        rows_written: state.rows_written,
        rows_skipped: state.rows_skipped,
        batches: state.batches,
        rows_per_second,
        completion_percent,
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl MigrationOutcome {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
