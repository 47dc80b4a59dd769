//! Configuration type definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::schema::{MigrationWindow, DEFAULT_TABLE};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database (MySQL/MariaDB).
    pub source: DatabaseConfig,

    /// Relational destination (MariaDB).
    pub relational: DatabaseConfig,

    /// Analytical destination (ClickHouse).
    pub analytical: AnalyticalConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// MySQL/MariaDB connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// ClickHouse connection settings (HTTP interface).
#[derive(Clone, Serialize, Deserialize)]
pub struct AnalyticalConfig {
    /// Host name, optionally with an `http://` or `https://` scheme.
    pub host: String,

    /// HTTP port (default: 8123).
    #[serde(default = "default_clickhouse_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for AnalyticalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticalConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Table migrated in all three stores (default: PROFILEPRICE).
    #[serde(default = "default_table")]
    pub table: String,

    /// Rows per batch (default: 10000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// `[start, end)` filter on CREATED (default: January 2024).
    #[serde(default)]
    pub window: MigrationWindow,

    /// Readiness probes before giving up (default: 30).
    #[serde(default = "default_readiness_attempts")]
    pub readiness_attempts: u32,

    /// Seconds between readiness probes (default: 2).
    #[serde(default = "default_readiness_delay_secs")]
    pub readiness_delay_secs: u64,

    /// Minimum seconds between progress lines (default: 5).
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,

    /// What an unreadable destination means to the emptiness guards.
    #[serde(default)]
    pub guard_error_policy: GuardErrorPolicy,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            batch_size: default_batch_size(),
            window: MigrationWindow::default(),
            readiness_attempts: default_readiness_attempts(),
            readiness_delay_secs: default_readiness_delay_secs(),
            progress_interval_secs: default_progress_interval_secs(),
            guard_error_policy: GuardErrorPolicy::default(),
        }
    }
}

impl MigrationConfig {
    pub fn readiness_delay(&self) -> Duration {
        Duration::from_secs(self.readiness_delay_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }
}

/// Outcome of an emptiness guard whose count query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardErrorPolicy {
    /// Log a warning and treat the destination as empty.
    #[default]
    AssumeEmpty,

    /// Abort the run with a guard error.
    Abort,
}

// Default value functions for serde
fn default_mysql_port() -> u16 {
    3306
}

fn default_clickhouse_port() -> u16 {
    8123
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_batch_size() -> usize {
    10_000
}

fn default_readiness_attempts() -> u32 {
    30
}

fn default_readiness_delay_secs() -> u64 {
    2
}

fn default_progress_interval_secs() -> u64 {
    5
}
