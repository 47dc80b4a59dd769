//! Pre-flight checks run once before the batch loop.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::GuardErrorPolicy;
use crate::core::traits::{AnalyticalWriter, RelationalWriter};
use crate::error::{MigrateError, Result};

/// Default number of readiness probes.
pub const DEFAULT_READINESS_ATTEMPTS: u32 = 30;

/// Default fixed delay between readiness probes.
pub const DEFAULT_READINESS_DELAY: Duration = Duration::from_secs(2);

/// Probe the analytical store until it answers, at most `max_attempts` times
/// with a fixed `delay` between attempts.
pub async fn wait_for_ready(
    store: &dyn AnalyticalWriter,
    max_attempts: u32,
    delay: Duration,
) -> bool {
    let mut attempt = 0;
    while attempt < max_attempts {
        match store.ping().await {
            Ok(()) => {
                info!("Analytical store connection established");
                return true;
            }
            Err(e) => {
                attempt += 1;
                if attempt < max_attempts {
                    info!(
                        "Waiting for analytical store (attempt {}/{}): {}",
                        attempt, max_attempts, e
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    warn!(
                        "Analytical store not reachable after {} attempts: {}",
                        max_attempts, e
                    );
                }
            }
        }
    }
    false
}

/// Whether the destination table exists in the analytical store. Errors count
/// as "missing".
pub async fn table_exists(store: &dyn AnalyticalWriter) -> bool {
    match store.table_exists().await {
        Ok(exists) => exists,
        Err(e) => {
            warn!("Failed to check analytical table existence: {}", e);
            false
        }
    }
}

/// Whether the analytical destination table holds no rows.
pub async fn is_analytical_target_empty(
    store: &dyn AnalyticalWriter,
    policy: GuardErrorPolicy,
) -> Result<bool> {
    match store.row_count().await {
        Ok(count) => Ok(count == 0),
        Err(e) => on_guard_error("analytical", e, policy),
    }
}

/// Whether the relational destination table holds no rows.
pub async fn is_relational_target_empty(
    store: &dyn RelationalWriter,
    policy: GuardErrorPolicy,
) -> Result<bool> {
    match store.row_count().await {
        Ok(count) => Ok(count == 0),
        Err(e) => on_guard_error("relational", e, policy),
    }
}

fn on_guard_error(target: &str, err: MigrateError, policy: GuardErrorPolicy) -> Result<bool> {
    match policy {
        GuardErrorPolicy::AssumeEmpty => {
            warn!(
                "Failed to count rows in {} target, treating it as empty: {}",
                target, err
            );
            Ok(true)
        }
        GuardErrorPolicy::Abort => Err(MigrateError::Guard(format!(
            "cannot count rows in {} target: {}",
            target, err
        ))),
    }
}
