//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.host.is_empty() {
        return Err(MigrateError::Config("source.host is required".into()));
    }
    if config.source.database.is_empty() {
        return Err(MigrateError::Config("source.database is required".into()));
    }
    if config.source.user.is_empty() {
        return Err(MigrateError::Config("source.user is required".into()));
    }

    // Relational target validation
    if config.relational.host.is_empty() {
        return Err(MigrateError::Config("relational.host is required".into()));
    }
    if config.relational.database.is_empty() {
        return Err(MigrateError::Config("relational.database is required".into()));
    }
    if config.relational.user.is_empty() {
        return Err(MigrateError::Config("relational.user is required".into()));
    }

    // Analytical target validation
    if config.analytical.host.is_empty() {
        return Err(MigrateError::Config("analytical.host is required".into()));
    }
    if config.analytical.database.is_empty() {
        return Err(MigrateError::Config("analytical.database is required".into()));
    }
    if config.analytical.user.is_empty() {
        return Err(MigrateError::Config("analytical.user is required".into()));
    }

    // Cannot migrate into the source table
    if config.source.host == config.relational.host
        && config.source.port == config.relational.port
        && config.source.database == config.relational.database
    {
        return Err(MigrateError::Config(
            "source and relational target cannot be the same database".into(),
        ));
    }

    // Table name is interpolated into SQL
    let table = &config.migration.table;
    if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MigrateError::Config(format!(
            "migration.table must be a plain identifier, got '{}'",
            table
        )));
    }

    if config.migration.batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }
    if config.migration.readiness_attempts == 0 {
        return Err(MigrateError::Config(
            "migration.readiness_attempts must be at least 1".into(),
        ));
    }
    if config.migration.window.start >= config.migration.window.end {
        return Err(MigrateError::Config(
            "migration.window.start must be before migration.window.end".into(),
        ));
    }

    Ok(())
}
