//! Throughput and ETA reporting for the batch loop.

use std::fmt;
use std::time::Duration;

use indicatif::HumanCount;
use tokio::time::Instant;
use tracing::{debug, info};

/// Minimum time between two snapshots logged by [`ProgressTracker::update`].
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Counts processed rows and logs progress at most once per interval.
#[derive(Debug)]
pub struct ProgressTracker {
    total_rows: u64,
    processed_rows: u64,
    start_time: Instant,
    last_update: Instant,
    interval: Duration,
}

/// Point-in-time progress figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub processed_rows: u64,
    pub total_rows: u64,
    pub percentage: f64,
    /// Average rows per second since start, truncated.
    pub rows_per_second: u64,
    pub elapsed_secs: u64,
    pub eta_secs: u64,
}

impl ProgressTracker {
    pub fn new(total_rows: u64) -> Self {
        Self::with_interval(total_rows, DEFAULT_PROGRESS_INTERVAL)
    }

    pub fn with_interval(total_rows: u64, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            total_rows,
            processed_rows: 0,
            start_time: now,
            last_update: now,
            interval,
        }
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn processed_rows(&self) -> u64 {
        self.processed_rows
    }

    /// Add `batch_size` processed rows. Logs a snapshot if the interval has
    /// passed since the last one; returns whether it did.
    pub fn update(&mut self, batch_size: u64) -> bool {
        let next = self.processed_rows.saturating_add(batch_size);
        if next > self.total_rows {
            debug!(
                "Processed rows {} exceed total {}, capping",
                next, self.total_rows
            );
        }
        self.processed_rows = next.min(self.total_rows);

        let now = Instant::now();
        if now.duration_since(self.last_update) >= self.interval {
            self.print_progress();
            self.last_update = now;
            true
        } else {
            false
        }
    }

    /// Log the current snapshot unconditionally.
    pub fn print_progress(&self) -> ProgressSnapshot {
        let snapshot = self.snapshot();
        info!("{}", snapshot);
        snapshot
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let percentage = if self.total_rows == 0 {
            100.0
        } else {
            self.processed_rows as f64 / self.total_rows as f64 * 100.0
        };

        let speed = if elapsed > 0.0 {
            self.processed_rows as f64 / elapsed
        } else {
            0.0
        };

        let remaining = self.total_rows - self.processed_rows;
        let eta = if speed > 0.0 {
            remaining as f64 / speed
        } else {
            0.0
        };

        ProgressSnapshot {
            processed_rows: self.processed_rows,
            total_rows: self.total_rows,
            percentage,
            rows_per_second: speed as u64,
            elapsed_secs: elapsed as u64,
            eta_secs: eta as u64,
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {}/{} ({:.2}%) | Speed: {} rows/s | Elapsed: {} | ETA: {}",
            HumanCount(self.processed_rows),
            HumanCount(self.total_rows),
            self.percentage,
            HumanCount(self.rows_per_second),
            format_hms(self.elapsed_secs),
            format_hms(self.eta_secs),
        )
    }
}

/// Render whole seconds as `H:MM:SS`.
pub fn format_hms(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
