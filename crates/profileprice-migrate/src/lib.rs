//! # profileprice-migrate
//!
//! One-time migration of the `PROFILEPRICE` table from a MySQL/MariaDB source
//! into a MariaDB copy and a ClickHouse copy.
//!
//! - **Keyset paging** over a fixed `CREATED` window
//! - **Per-column coercion** driven by a declarative column table
//! - **Idempotency guards**: a run that finds data in either destination
//!   writes nothing
//! - **Resume capability** via an optional HMAC-signed JSON state file
//!
//! ## Example
//!
//! ```rust,no_run
//! use profileprice_migrate::{Config, MigrationOutcome, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> profileprice_migrate::Result<()> {
//!     let config = Config::from_env()?;
//!     let orchestrator = Orchestrator::connect(config).await?;
//!     if let MigrationOutcome::Completed(result) = orchestrator.run().await? {
//!         println!("Migrated {} rows", result.rows_written);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod state;
pub mod transfer;

// Re-exports for convenient access
pub use config::{AnalyticalConfig, Config, DatabaseConfig, GuardErrorPolicy, MigrationConfig};
pub use convert::{convert_row, convert_value, ConversionError};
pub use self::core::{
    AnalyticalWriter, Batch, MigrationWindow, PriceRecord, RelationalWriter, Row, SourceReader,
    SqlValue,
};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    HealthCheckResult, MigrationOutcome, MigrationResult, Orchestrator, SkipReason, StoreHealth,
    ValidationReport,
};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use state::MigrationState;
pub use transfer::{TransferConfig, TransferEngine, TransferJob, TransferStats};
