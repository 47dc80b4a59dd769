//! File-based state management for resume capability.
//!
//! The state records how far each destination has been written. Before a
//! batch is written its key range is staged; the relational watermark moves
//! after the relational commit and the analytical watermark moves (and the
//! stage is cleared) after the analytical insert. Anything between the
//! analytical watermark and the highest staged or relational key may exist in
//! one destination only and is deleted from both before a resumed run.

use crate::error::{MigrateError, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Migration state for resume capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationState {
    /// Unique run identifier.
    pub run_id: String,

    /// SHA256 hash of the configuration.
    pub config_hash: String,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// Current run status.
    pub status: RunStatus,

    /// Migrated table.
    pub table: String,

    /// Rows in the window when the run started.
    pub rows_total: i64,

    /// Rows read from the source so far.
    #[serde(default)]
    pub rows_read: i64,

    /// Rows written to both destinations.
    #[serde(default)]
    pub rows_written: i64,

    /// Rows dropped by the converter.
    #[serde(default)]
    pub rows_skipped: i64,

    /// Batches fully written.
    #[serde(default)]
    pub batches: u64,

    /// Highest key committed to the relational destination.
    pub relational_last_key: Option<i64>,

    /// Highest key written to the analytical destination.
    pub analytical_last_key: Option<i64>,

    /// Batch announced but not yet written to both destinations.
    pub staged: Option<StagedBatch>,

    /// When the migration completed (if finished).
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message if failed.
    pub error: Option<String>,

    /// HMAC-SHA256 signature for integrity validation.
    /// Computed over serialized state (excluding this field) using config_hash as key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac: Option<String>,
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Key range of a batch about to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedBatch {
    pub first_key: i64,
    pub last_key: i64,
    pub rows: usize,
}

impl MigrationState {
    /// Create a new migration state.
    pub fn new(run_id: String, config_hash: String, table: &str, rows_total: i64) -> Self {
        Self {
            run_id,
            config_hash,
            started_at: Utc::now(),
            status: RunStatus::Running,
            table: table.to_string(),
            rows_total,
            rows_read: 0,
            rows_written: 0,
            rows_skipped: 0,
            batches: 0,
            relational_last_key: None,
            analytical_last_key: None,
            staged: None,
            completed_at: None,
            error: None,
            hmac: None, // Will be computed on first save
        }
    }

    /// Compute HMAC-SHA256 signature for state integrity validation.
    ///
    /// Uses config_hash as HMAC key.
    fn compute_hmac(&self) -> Result<String> {
        // Create a copy without HMAC for signing
        let mut state_for_signing = self.clone();
        state_for_signing.hmac = None;

        let content = serde_json::to_string(&state_for_signing)?;

        let mut mac = HmacSha256::new_from_slice(self.config_hash.as_bytes())
            .map_err(|e| MigrateError::State(format!("Failed to create HMAC: {}", e)))?;

        mac.update(content.as_bytes());
        let result = mac.finalize();
        Ok(hex::encode(result.into_bytes()))
    }

    /// Load state from a file with integrity validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&content)?;

        match &state.hmac {
            Some(stored_hmac) => {
                let expected_hmac = state.compute_hmac()?;
                if stored_hmac != &expected_hmac {
                    return Err(MigrateError::State(
                        "integrity check failed: HMAC mismatch (possible tampering)".to_string(),
                    ));
                }
            }
            None => {
                return Err(MigrateError::State(
                    "state file has no HMAC signature".to_string(),
                ));
            }
        }

        Ok(state)
    }

    /// Save state to a file (atomic write with HMAC).
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Compute HMAC before serialization
        self.hmac = Some(self.compute_hmac()?);

        let content = serde_json::to_string_pretty(self)?;

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Validate that the config hash matches for resume.
    pub fn validate_config(&self, config_hash: &str) -> Result<()> {
        if self.config_hash != config_hash {
            return Err(MigrateError::ConfigChanged);
        }
        Ok(())
    }

    /// Key range that may be present in one destination but not the other,
    /// as `(after_key, up_to_key)`. `None` when both destinations agree.
    pub fn pending_range(&self) -> Option<(Option<i64>, i64)> {
        let upper = [
            self.relational_last_key,
            self.staged.map(|s| s.last_key),
        ]
        .into_iter()
        .flatten()
        .max()?;

        match self.analytical_last_key {
            Some(done) if done >= upper => None,
            done => Some((done, upper)),
        }
    }

    /// Mark the migration as completed.
    pub fn mark_completed(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.error = None;
    }

    /// Mark the migration as failed.
    pub fn mark_failed(&mut self, error: &str) {
        self.status = RunStatus::Failed;
        self.error = Some(error.to_string());
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Persists [`MigrationState`] at each step of a batch. Without a path every
/// save is a no-op, so the engine calls it unconditionally.
#[derive(Debug)]
pub struct Checkpointer {
    state: MigrationState,
    path: Option<PathBuf>,
}

impl Checkpointer {
    pub fn new(state: MigrationState, path: Option<PathBuf>) -> Self {
        Self { state, path }
    }

    pub fn state(&self) -> &MigrationState {
        &self.state
    }

    pub fn into_state(self) -> MigrationState {
        self.state
    }

    /// Apply `f` to the state and persist it.
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut MigrationState),
    {
        f(&mut self.state);
        self.save()
    }

    pub fn save(&mut self) -> Result<()> {
        match &self.path {
            Some(path) => {
                self.state.save(path)?;
                debug!("Saved state to {}", path.display());
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Move both watermarks past a batch that had nothing to write.
    pub fn advance(&mut self, last_key: i64, read: usize, skipped: usize) -> Result<()> {
        self.update(|s| {
            s.relational_last_key = Some(last_key);
            s.analytical_last_key = Some(last_key);
            s.staged = None;
            s.rows_read += read as i64;
            s.rows_skipped += skipped as i64;
            s.batches += 1;
        })
    }

    /// Record a batch about to be written.
    pub fn stage(&mut self, batch: StagedBatch) -> Result<()> {
        self.update(|s| s.staged = Some(batch))
    }

    /// Record the relational commit of the staged batch.
    pub fn relational_done(&mut self, last_key: i64) -> Result<()> {
        self.update(|s| s.relational_last_key = Some(last_key))
    }

    /// Record the analytical insert of the staged batch and clear the stage.
    /// Row counters only move here, so a batch replayed after a resume is
    /// counted once.
    pub fn analytical_done(
        &mut self,
        last_key: i64,
        read: usize,
        written: u64,
        skipped: usize,
    ) -> Result<()> {
        self.update(|s| {
            s.analytical_last_key = Some(last_key);
            s.staged = None;
            s.rows_read += read as i64;
            s.rows_written += written as i64;
            s.rows_skipped += skipped as i64;
            s.batches += 1;
        })
    }
}
