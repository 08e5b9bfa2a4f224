//! Input sanitization middleware
//!
//! Rewrites untrusted request input before any handler reads it:
//!
//! - duplicate query/form keys collapse to their last value, except keys in
//!   [`MULTI_VALUE_KEYS`] which legitimately repeat;
//! - keys beginning with `$` or containing `.` (query-operator injection)
//!   are dropped;
//! - `<` and `>` in values are HTML-entity escaped.
//!
//! Applies to query strings, urlencoded form bodies, and JSON bodies
//! (recursively). Multipart bodies pass through untouched; the upload
//! handler enforces its own rules.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, uri::PathAndQuery, HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use url::form_urlencoded;

use crate::config::Settings;
use crate::error::ApiError;

/// Query/form keys allowed to appear more than once.
pub const MULTI_VALUE_KEYS: &[&str] = &["positions"];

pub async fn sanitize_request(
    State(settings): State<Arc<Settings>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    if let Some(query) = parts.uri.query() {
        let cleaned = sanitize_pairs(query);
        if cleaned != query {
            parts.uri = with_query(&parts.uri, &cleaned)?;
        }
    }

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let body = if content_type.starts_with("application/json") {
        let bytes = read_body(&parts.headers, body, settings.max_body_bytes).await?;
        rewrite_json_body(&mut parts.headers, bytes)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let bytes = read_body(&parts.headers, body, settings.max_body_bytes).await?;
        rewrite_form_body(&mut parts.headers, bytes)
    } else {
        body
    };

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Buffer the body, enforcing the configured cap before any parser sees it.
async fn read_body(
    headers: &axum::http::HeaderMap,
    body: Body,
    max_bytes: usize,
) -> Result<Bytes, ApiError> {
    if let Some(len) = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
    {
        if len > max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "Request body exceeds the {} byte limit",
                max_bytes
            )));
        }
    }

    axum::body::to_bytes(body, max_bytes).await.map_err(|_| {
        ApiError::PayloadTooLarge(format!(
            "Request body exceeds the {} byte limit",
            max_bytes
        ))
    })
}

fn rewrite_json_body(headers: &mut axum::http::HeaderMap, bytes: Bytes) -> Body {
    // Invalid JSON passes through unchanged; the Json extractor owns that 400.
    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(mut value) => {
            sanitize_json(&mut value);
            let cleaned = serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec());
            set_content_length(headers, cleaned.len());
            Body::from(cleaned)
        }
        Err(_) => Body::from(bytes),
    }
}

fn rewrite_form_body(headers: &mut axum::http::HeaderMap, bytes: Bytes) -> Body {
    let raw = String::from_utf8_lossy(&bytes).into_owned();
    let cleaned = sanitize_pairs(&raw);
    set_content_length(headers, cleaned.len());
    Body::from(cleaned)
}

fn set_content_length(headers: &mut axum::http::HeaderMap, len: usize) {
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
}

/// Rewrite a `k=v&k=v` pair string: drop forbidden keys, collapse
/// duplicates (last value wins) outside the multi-value whitelist, and
/// escape angle brackets in values.
pub fn sanitize_pairs(raw: &str) -> String {
    let mut kept: Vec<(String, String)> = Vec::new();

    for (key, value) in form_urlencoded::parse(raw.as_bytes()).into_owned() {
        if is_forbidden_key(&key) {
            continue;
        }
        let value = escape_angle_brackets(&value);
        if MULTI_VALUE_KEYS.contains(&key.as_str()) {
            kept.push((key, value));
        } else if let Some(existing) = kept.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            kept.push((key, value));
        }
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &kept {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Recursively sanitize a JSON document in place.
pub fn sanitize_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            let forbidden: Vec<String> = map
                .keys()
                .filter(|k| is_forbidden_key(k))
                .cloned()
                .collect();
            for key in forbidden {
                map.remove(&key);
            }
            for (_, v) in map.iter_mut() {
                sanitize_json(v);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                sanitize_json(item);
            }
        }
        serde_json::Value::String(s) => {
            if s.contains('<') || s.contains('>') {
                *s = escape_angle_brackets(s);
            }
        }
        _ => {}
    }
}

fn is_forbidden_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.')
}

fn escape_angle_brackets(s: &str) -> String {
    s.replace('<', "&lt;").replace('>', "&gt;")
}

fn with_query(uri: &Uri, query: &str) -> Result<Uri, ApiError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|_| ApiError::BadRequest("Invalid query string".to_string()))?,
    );
    Uri::from_parts(parts).map_err(|_| ApiError::BadRequest("Invalid request URI".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, routing::post, Router};
    use tower::ServiceExt;

    #[test]
    fn test_pairs_drop_operator_keys() {
        let cleaned = sanitize_pairs("title=dev&%24where=1&a.b=2");
        assert_eq!(cleaned, "title=dev");
    }

    #[test]
    fn test_pairs_collapse_duplicates_last_wins() {
        let cleaned = sanitize_pairs("sort=salary&sort=created_at");
        assert_eq!(cleaned, "sort=created_at");
    }

    #[test]
    fn test_pairs_keep_whitelisted_duplicates() {
        let cleaned = sanitize_pairs("positions=1&positions=3");
        assert_eq!(cleaned, "positions=1&positions=3");
    }

    #[test]
    fn test_pairs_escape_angle_brackets() {
        let cleaned = sanitize_pairs("q=%3Cscript%3E");
        assert_eq!(cleaned, "q=%26lt%3Bscript%26gt%3B");
    }

    #[test]
    fn test_json_sanitized_recursively() {
        let mut value = serde_json::json!({
            "title": "<b>dev</b>",
            "$where": "1 == 1",
            "nested": { "a.b": 1, "ok": ["<i>", 2] }
        });
        sanitize_json(&mut value);
        assert_eq!(value["title"], "&lt;b&gt;dev&lt;/b&gt;");
        assert!(value.get("$where").is_none());
        assert!(value["nested"].get("a.b").is_none());
        assert_eq!(value["nested"]["ok"][0], "&lt;i&gt;");
    }

    fn sanitizing_app() -> Router {
        let settings = Arc::new(Settings::default());
        Router::new()
            .route(
                "/echo-query",
                get(|req: Request| async move {
                    req.uri().query().unwrap_or_default().to_string()
                }),
            )
            .route(
                "/echo-body",
                post(|body: String| async move { body }),
            )
            .layer(middleware::from_fn_with_state(settings, sanitize_request))
    }

    #[tokio::test]
    async fn test_query_rewritten_before_handler() {
        let response = sanitizing_app()
            .oneshot(
                Request::builder()
                    .uri("/echo-query?title=dev&%24where=1&title=ops&positions=1&positions=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let query = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(query, "title=ops&positions=1&positions=2");
    }

    #[tokio::test]
    async fn test_json_body_rewritten_before_handler() {
        let response = sanitizing_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo-body")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"<x>","$gt":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["name"], "&lt;x&gt;");
        assert!(value.get("$gt").is_none());
    }

    #[tokio::test]
    async fn test_oversized_json_body_rejected() {
        let mut settings = Settings::default();
        settings.max_body_bytes = 16;
        let app = Router::new()
            .route("/echo-body", post(|body: String| async move { body }))
            .layer(middleware::from_fn_with_state(
                Arc::new(settings),
                sanitize_request,
            ));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo-body")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"a very long value indeed"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_invalid_json_passes_through() {
        let response = sanitizing_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo-body")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("not-json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"not-json");
    }
}
