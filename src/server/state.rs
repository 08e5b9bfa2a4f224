//! Application state container
//!
//! This module defines the shared application state that is passed
//! to all request handlers via Axum's state extraction.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::db::{postgres, ApplicationRepository, JobRepository, UserRepository};
use crate::server::shutdown::ShutdownController;

/// Shared application state
///
/// Holds every resource handlers need. Cheaply cloneable and immutable
/// after startup; the pool and limiter caches manage their own interior
/// state.
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// PostgreSQL pool (kept for health checks; repositories hold clones)
    pub pool: PgPool,

    pub users: UserRepository,
    pub jobs: JobRepository,
    pub applications: ApplicationRepository,

    /// Handle for reporting unrecoverable asynchronous faults
    pub shutdown: ShutdownController,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The database connection is awaited here; if it cannot be
    /// established, startup fails entirely.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);
        let start_time = Instant::now();

        let pool = postgres::connect(&settings).await?;

        tracing::info!("Application state initialized");

        Ok(Self::from_parts(settings, pool, start_time))
    }

    fn from_parts(settings: Arc<Settings>, pool: PgPool, start_time: Instant) -> Self {
        Self {
            settings,
            users: UserRepository::new(pool.clone()),
            jobs: JobRepository::new(pool.clone()),
            applications: ApplicationRepository::new(pool.clone()),
            pool,
            shutdown: ShutdownController::new(),
            start_time,
        }
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Build a state around a lazy pool that never connects.
    ///
    /// Router-level tests exercise routing, sanitization, auth rejection,
    /// and the 404 fallback without a live database.
    #[cfg(test)]
    pub fn for_tests(settings: Settings) -> Self {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&settings.database_url)
            .expect("lazy pool");
        Self::from_parts(Arc::new(settings), pool, Instant::now())
    }
}
