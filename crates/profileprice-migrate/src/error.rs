//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (missing environment variable, invalid YAML, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Relational destination connection or query error
    #[error("Relational target error: {0}")]
    Relational(#[from] mysql_async::Error),

    /// Analytical destination connection or query error
    #[error("Analytical target error: {0}")]
    Analytical(#[from] clickhouse::error::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Analytical store never accepted a query
    #[error("Analytical store not available after {attempts} attempts")]
    ReadinessTimeout { attempts: u32 },

    /// Destination table missing in the analytical store
    #[error("Table {0} does not exist in the analytical store")]
    TableMissing(String),

    /// Emptiness guard could not read a destination and the policy is to abort
    #[error("Guard check failed: {0}")]
    Guard(String),

    /// Converted value does not fit the analytical column type
    #[error("Type check failed for column {column}: expected {expected}, found {found}")]
    TypeCheck {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// Data transfer failed for a table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// State file error
    #[error("State file error: {0}")]
    State(String),

    /// Config hash mismatch on resume
    #[error("Config has changed since last run - cannot resume. Start a fresh run instead.")]
    ConfigChanged,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 1,
            MigrateError::Source(_) => 2,
            MigrateError::Relational(_) | MigrateError::Pool { .. } => 3,
            MigrateError::Analytical(_) => 4,
            MigrateError::ReadinessTimeout { .. } => 5,
            MigrateError::TableMissing(_) | MigrateError::Guard(_) => 6,
            MigrateError::Io(_) => 7,
            MigrateError::TypeCheck { .. } | MigrateError::Transfer { .. } => 8,
            MigrateError::State(_) | MigrateError::ConfigChanged | MigrateError::Json(_) => 9,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 1);
        assert_eq!(MigrateError::ReadinessTimeout { attempts: 30 }.exit_code(), 5);
        assert_eq!(MigrateError::TableMissing("PROFILEPRICE".into()).exit_code(), 6);
        assert_eq!(MigrateError::transfer("PROFILEPRICE", "boom").exit_code(), 8);
        assert_eq!(MigrateError::ConfigChanged.exit_code(), 9);
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = MigrateError::transfer("PROFILEPRICE", "insert rejected");
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Transfer failed for table PROFILEPRICE"));
        assert!(detailed.contains("insert rejected"));
    }
}
