//! Configuration loading and validation.
//!
//! Connection settings normally come from the environment (`MYSQL_*`,
//! `MARIADB_TARGET_*`, `CLICKHOUSE_*`); a YAML file can be used instead.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Environment variable prefix for the source database.
pub const SOURCE_ENV_PREFIX: &str = "MYSQL";

/// Environment variable prefix for the relational destination.
pub const RELATIONAL_ENV_PREFIX: &str = "MARIADB_TARGET";

/// Environment variable prefix for the analytical destination.
pub const ANALYTICAL_ENV_PREFIX: &str = "CLICKHOUSE";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Host, user, password and database are required for each store; ports
    /// are optional. Migration settings keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = database_from_lookup(&lookup, SOURCE_ENV_PREFIX, 3306)?;
        let relational = database_from_lookup(&lookup, RELATIONAL_ENV_PREFIX, 3306)?;
        let analytical = AnalyticalConfig {
            host: required(&lookup, ANALYTICAL_ENV_PREFIX, "HOST")?,
            port: optional_port(&lookup, ANALYTICAL_ENV_PREFIX, 8123)?,
            database: required(&lookup, ANALYTICAL_ENV_PREFIX, "DATABASE")?,
            user: required(&lookup, ANALYTICAL_ENV_PREFIX, "USER")?,
            password: required(&lookup, ANALYTICAL_ENV_PREFIX, "PASSWORD")?,
        };

        let config = Config {
            source,
            relational,
            analytical,
            migration: MigrationConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration for resume validation.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl AnalyticalConfig {
    /// HTTP endpoint of the ClickHouse server.
    pub fn url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

fn database_from_lookup<F>(lookup: &F, prefix: &str, default_port: u16) -> Result<DatabaseConfig>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(DatabaseConfig {
        host: required(lookup, prefix, "HOST")?,
        port: optional_port(lookup, prefix, default_port)?,
        database: required(lookup, prefix, "DATABASE")?,
        user: required(lookup, prefix, "USER")?,
        password: required(lookup, prefix, "PASSWORD")?,
    })
}

fn required<F>(lookup: &F, prefix: &str, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let name = format!("{}_{}", prefix, key);
    lookup(&name)
        .ok_or_else(|| MigrateError::Config(format!("missing environment variable {}", name)))
}

fn optional_port<F>(lookup: &F, prefix: &str, default: u16) -> Result<u16>
where
    F: Fn(&str) -> Option<String>,
{
    let name = format!("{}_PORT", prefix);
    match lookup(&name) {
        None => Ok(default),
        Some(raw) => u16::from_str(raw.trim()).map_err(|_| {
            MigrateError::Config(format!("invalid port in {}: '{}'", name, raw))
        }),
    }
}
