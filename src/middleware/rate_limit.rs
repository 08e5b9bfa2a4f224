//! Rate limiting middleware
//!
//! Enforces the per-client request budget (100 requests per 10-minute
//! window by default). Each client gets its own token-bucket limiter,
//! cached in memory and dropped after a window of inactivity.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use moka::future::Cache;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::ApiError;

/// Type alias for one client's limiter instance
type ClientRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limit state shared across requests
#[derive(Clone)]
pub struct RateLimitState {
    pub settings: Arc<Settings>,

    /// Cache of rate limiters per client key.
    pub limiters: Cache<String, Arc<ClientRateLimiter>>,
}

impl RateLimitState {
    pub fn new(settings: Arc<Settings>) -> Self {
        // Idle limiters expire after one full window.
        let idle_seconds = settings.rate_limit.window_seconds.max(60);
        let limiters = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(idle_seconds))
            .build();

        Self { settings, limiters }
    }

    /// Get or create the limiter for the given client key.
    pub async fn get_limiter(&self, client: &str) -> Arc<ClientRateLimiter> {
        if let Some(limiter) = self.limiters.get(client).await {
            return limiter;
        }

        let limiter = Arc::new(self.create_limiter());
        self.limiters
            .insert(client.to_string(), limiter.clone())
            .await;

        limiter
    }

    /// Build a limiter allowing bursts up to the full window budget,
    /// replenishing over the window period.
    fn create_limiter(&self) -> ClientRateLimiter {
        let max_requests = self.settings.rate_limit.max_requests;
        let window_seconds = self.settings.rate_limit.window_seconds;

        let quota = if window_seconds > 0 && max_requests > 0 {
            let replenish_period = Duration::from_secs(window_seconds) / max_requests;
            Quota::with_period(replenish_period)
                .unwrap()
                .allow_burst(NonZeroU32::new(max_requests).unwrap())
        } else {
            // Fallback: 100 requests per minute
            Quota::per_minute(NonZeroU32::new(100).unwrap())
        };

        RateLimiter::direct(quota)
    }
}

/// Middleware to enforce the per-client rate limit.
///
/// Clients are keyed by the first `X-Forwarded-For` value when present,
/// otherwise by the peer socket address.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.settings.rate_limit.enabled {
        return Ok(next.run(request).await);
    }

    let client = client_key(&request);
    let limiter = state.get_limiter(&client).await;

    match limiter.check() {
        Ok(_) => {
            let mut response = next.run(request).await;
            let limit = state.settings.rate_limit.max_requests;
            if let Ok(value) = limit.to_string().parse() {
                response.headers_mut().insert("x-ratelimit-limit", value);
            }
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until.wait_time_from(DefaultClock::default().now());
            let retry_after_seconds = retry_after.as_secs().max(1);

            tracing::warn!(
                client = %client,
                retry_after_seconds = retry_after_seconds,
                "Rate limit exceeded"
            );

            let mut response = ApiError::RateLimited.into_response();
            let headers = response.headers_mut();
            if let Ok(value) = retry_after_seconds.to_string().parse() {
                headers.insert("retry-after", value);
            }
            if let Ok(value) = retry_after_seconds.to_string().parse() {
                headers.insert("x-ratelimit-reset", value);
            }
            Ok(response)
        }
    }
}

/// Derive the client key for rate limiting.
fn client_key(request: &Request<Body>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn small_budget_settings(max_requests: u32) -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.rate_limit.max_requests = max_requests;
        settings.rate_limit.window_seconds = 600;
        Arc::new(settings)
    }

    fn limited_app(state: RateLimitState) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state, rate_limit))
    }

    #[test]
    fn test_burst_up_to_budget_then_rejects() {
        let state = RateLimitState::new(small_budget_settings(10));
        let limiter = state.create_limiter();

        for i in 0..10 {
            assert!(limiter.check().is_ok(), "request {} should be allowed", i);
        }
        assert!(limiter.check().is_err(), "request 11 should be rejected");
    }

    #[tokio::test]
    async fn test_limiter_cached_per_client() {
        let state = RateLimitState::new(small_budget_settings(100));

        let first = state.get_limiter("10.0.0.1").await;
        let second = state.get_limiter("10.0.0.1").await;
        assert!(Arc::ptr_eq(&first, &second));

        let other = state.get_limiter("10.0.0.2").await;
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn test_rejection_carries_retry_headers() {
        let state = RateLimitState::new(small_budget_settings(1));
        let app = limited_app(state);

        let ok = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(ok.headers()["x-ratelimit-limit"], "1");

        let limited = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key("retry-after"));
        assert!(limited.headers().contains_key("x-ratelimit-reset"));
    }

    #[tokio::test]
    async fn test_clients_have_separate_budgets() {
        let state = RateLimitState::new(small_budget_settings(1));
        let app = limited_app(state);

        for ip in ["198.51.100.1", "198.51.100.2"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/")
                        .header("x-forwarded-for", ip)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "first request for {}", ip);
        }
    }

    #[tokio::test]
    async fn test_disabled_rate_limit_passes_everything() {
        let mut settings = Settings::default();
        settings.rate_limit.enabled = false;
        settings.rate_limit.max_requests = 1;
        let state = RateLimitState::new(Arc::new(settings));
        let app = limited_app(state);

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/")
                        .header("x-forwarded-for", "192.0.2.1")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
