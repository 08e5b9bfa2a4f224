//! PostgreSQL pool construction
//!
//! The pool is built once at startup. A failed initial connection fails
//! startup entirely; there is no lazy or fire-and-forget mode.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Settings;

/// Connect to PostgreSQL and run any pending migrations.
///
/// Awaited during application construction so that a dead database is a
/// startup error, not a per-request one.
pub async fn connect(settings: &Settings) -> Result<PgPool> {
    tracing::debug!(
        max_connections = settings.database_max_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(settings.database_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database connected and migrations applied");

    Ok(pool)
}

/// Check database connectivity with a trivial round trip.
///
/// Used by the readiness probe.
pub async fn health_check(pool: &PgPool) -> bool {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await {
        Ok(_) => {
            tracing::debug!("Database health check passed");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    }
}
