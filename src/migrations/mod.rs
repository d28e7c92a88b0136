// Migration orchestrator for KomplekIn Backend
// Migrations are embedded in the application binary so the container
// needs no diesel CLI.

pub mod diesel;

use crate::db::DieselPool;
use std::error::Error;
use tracing::{error, info};

/// Run all pending database migrations at startup
pub async fn run_all_migrations(
    diesel_pool: &DieselPool,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let environment = crate::app_config::config().server.environment.to_string();
    info!(
        "[MIGRATIONS] Starting migration process for environment: {}",
        environment
    );

    match diesel::run_migrations(diesel_pool).await {
        Ok(applied_count) => {
            if applied_count > 0 {
                info!("[MIGRATIONS] Applied {} Diesel migrations", applied_count);
            } else {
                info!("[MIGRATIONS] Diesel migrations up to date");
            }
            Ok(())
        }
        Err(e) => {
            error!("[MIGRATIONS] Diesel migration failed: {}", e);
            Err(format!("Diesel migration failed: {}", e).into())
        }
    }
}

/// Embedded migrations can be disabled when an external pipeline owns the
/// schema
pub fn should_run_migrations() -> bool {
    std::env::var("DISABLE_EMBEDDED_MIGRATIONS")
        .map(|v| v != "true" && v != "1")
        .unwrap_or(true)
}
