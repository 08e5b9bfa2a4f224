//! Application routing
//!
//! Assembles the whole HTTP surface: the ordered middleware pipeline, the
//! three `/api/v1` route groups (jobs, auth, users), static assets, and
//! the unmatched-route fallback.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request, State},
    http::{Method, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::api::{auth, health, jobs, users};
use crate::config::Settings;
use crate::error::ApiError;
use crate::middleware::{
    log_request, rate_limit, require_auth, sanitize_request, security_headers, AuthState,
    RateLimitState,
};
use crate::server::state::AppState;

/// Prefix all route groups are mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// Create the main application router.
///
/// The pipeline order is a correctness requirement, not a style choice:
/// logging runs first, then security headers, CORS, the body cap, input
/// sanitization, and rate limiting, all before any route handler.
/// Authentication applies per route. The static/404 fallback runs only
/// after every real route has had its chance.
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();
    let auth_state = AuthState::new(settings.clone(), state.users.clone());
    let rate_limit_state = RateLimitState::new(settings.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/liveness", get(health::liveness));

    Router::new()
        .nest(API_PREFIX, jobs_routes(auth_state.clone()))
        .nest(API_PREFIX, auth_routes(auth_state.clone()))
        .nest(API_PREFIX, user_routes(auth_state))
        .merge(health_routes)
        .fallback(static_or_404)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(log_request))
                .layer(axum_middleware::from_fn_with_state(
                    settings.clone(),
                    security_headers,
                ))
                .layer(create_cors_layer())
                .layer(DefaultBodyLimit::max(body_limit(&settings)))
                .layer(axum_middleware::from_fn_with_state(
                    settings.clone(),
                    sanitize_request,
                ))
                .layer(axum_middleware::from_fn_with_state(
                    rate_limit_state,
                    rate_limit,
                )),
        )
        .with_state(state)
}

/// Job routes: public browsing, protected publishing and applications.
fn jobs_routes(auth_state: AuthState) -> Router<AppState> {
    let auth_layer = axum_middleware::from_fn_with_state(auth_state, require_auth);

    Router::new()
        .route(
            "/jobs",
            get(jobs::list_jobs)
                .merge(post(jobs::create_job).route_layer(auth_layer.clone())),
        )
        .route(
            "/jobs/:id",
            get(jobs::get_job).merge(
                put(jobs::update_job)
                    .delete(jobs::delete_job)
                    .route_layer(auth_layer.clone()),
            ),
        )
        .route(
            "/jobs/:id/apply",
            post(jobs::apply_to_job).route_layer(auth_layer),
        )
        .route("/stats/:topic", get(jobs::job_stats))
}

/// Auth routes: register and login are public, logout requires a session.
fn auth_routes(auth_state: AuthState) -> Router<AppState> {
    let auth_layer = axum_middleware::from_fn_with_state(auth_state, require_auth);

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout).route_layer(auth_layer))
}

/// Account routes; every endpoint requires a session.
fn user_routes(auth_state: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(users::me).put(users::update_me).delete(users::delete_me),
        )
        .route("/me/password", put(users::update_password))
        .route("/me/applications", get(users::my_applications))
        .route("/me/jobs", get(users::my_jobs))
        .route_layer(axum_middleware::from_fn_with_state(auth_state, require_auth))
}

/// Create CORS layer permitting any origin (public API default).
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            "x-trace-id".parse().unwrap(),
            "x-request-id".parse().unwrap(),
            "x-ratelimit-limit".parse().unwrap(),
            "x-ratelimit-reset".parse().unwrap(),
            "retry-after".parse().unwrap(),
        ])
}

/// The request-body cap must admit the largest legal upload.
fn body_limit(settings: &Settings) -> usize {
    settings
        .max_body_bytes
        .max(settings.max_upload_bytes + 64 * 1024)
}

/// Fallback for every unmatched route.
///
/// GET/HEAD requests first get a chance to hit a static asset in the
/// public directory; everything else is a structured 404 naming the
/// requested URL.
async fn static_or_404(State(state): State<AppState>, request: Request) -> Response {
    let original_url = request.uri().to_string();

    if request.method() == Method::GET || request.method() == Method::HEAD {
        let serve_dir = ServeDir::new(&state.settings.static_dir);
        match serve_dir.oneshot(request).await {
            Ok(response) if response.status() != StatusCode::NOT_FOUND => {
                return response.map(Body::new);
            }
            _ => {}
        }
    }

    ApiError::route_not_found(&original_url).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use http_body_util::BodyExt;
    use std::io::Write;

    fn test_router(settings: Settings) -> Router {
        create_router(AppState::for_tests(settings))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_unmatched_route_is_structured_404() {
        let response = test_router(Settings::default())
            .oneshot(
                Request::builder()
                    .uri("/api/v2/nothing-here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_string(response).await;
        assert!(body.contains("/api/v2/nothing-here route not found"), "{}", body);
    }

    #[tokio::test]
    async fn test_unmatched_route_404_for_any_method() {
        for method in ["POST", "PUT", "DELETE", "PATCH"] {
            let response = test_router(Settings::default())
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/nope")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "method {}", method);
        }
    }

    #[tokio::test]
    async fn test_protected_route_rejects_missing_token() {
        let response = test_router(Settings::default())
            .oneshot(Request::builder().uri("/api/v1/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_route_rejects_garbage_token() {
        let response = test_router(Settings::default())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/me/jobs")
                    .header(header::AUTHORIZATION, "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_security_headers_present_on_404() {
        let response = test_router(Settings::default())
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    }

    #[tokio::test]
    async fn test_static_asset_served_from_public_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("hello.txt")).unwrap();
        writeln!(file, "static hello").unwrap();

        let mut settings = Settings::default();
        settings.static_dir = dir.path().to_string_lossy().into_owned();

        let response = test_router(settings)
            .oneshot(
                Request::builder()
                    .uri("/hello.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("static hello"));
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_after_budget() {
        let mut settings = Settings::default();
        settings.rate_limit.max_requests = 2;
        let app = test_router(settings);

        for expected in [StatusCode::NOT_FOUND, StatusCode::NOT_FOUND] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/missing")
                        .header("x-forwarded-for", "203.0.113.7")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/missing")
                    .header("x-forwarded-for", "203.0.113.7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
    }

    #[tokio::test]
    async fn test_query_sanitized_before_dispatch() {
        // The $-prefixed key is stripped before the fallback sees the URL.
        let response = test_router(Settings::default())
            .oneshot(
                Request::builder()
                    .uri("/missing?ok=1&%24where=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_string(response).await;
        assert!(body.contains("/missing?ok=1 route not found"), "{}", body);
    }

    #[tokio::test]
    async fn test_health_endpoint_up_without_database() {
        let response = test_router(Settings::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("\"status\":\"healthy\""));
    }

    #[tokio::test]
    async fn test_validation_error_is_400_with_envelope() {
        // Register with a too-short password; fails validation before any
        // database access.
        let response = test_router(Settings::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"name":"Ada","email":"ada@example.test","password":"short"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_string(response).await;
        assert!(body.contains("\"success\":false"), "{}", body);
        assert!(body.contains("validation_error"), "{}", body);
    }
}
