//! Health check endpoints
//!
//! Monitoring and orchestration probes: overall health, readiness
//! (includes a live database ping), and liveness.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::db::postgres;
use crate::server::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: bool,
}

#[derive(Serialize)]
pub struct LivenessResponse {
    pub alive: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.settings.app_version.clone(),
        environment: state.settings.environment.to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// GET /ready
///
/// Ready only when the database answers a ping; load balancers use this
/// to decide whether the instance should receive traffic.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = postgres::health_check(&state.pool).await;

    let status = if database {
        StatusCode::OK
    } else {
        tracing::warn!(database, "Service not ready");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}

/// GET /liveness
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { alive: true })
}
