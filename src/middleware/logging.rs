//! Request logging middleware
//!
//! Every request gets a trace ID (taken from the incoming headers when the
//! caller supplied one, generated otherwise). The ID is stored in request
//! extensions, recorded on a per-request span, and echoed back on the
//! response so clients and logs can be correlated.

use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Header name for trace ID
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Header name for request ID (alias for trace ID)
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation ID, available to handlers via extensions.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    fn for_request(request: &Request) -> Self {
        let incoming = [TRACE_ID_HEADER, REQUEST_ID_HEADER]
            .iter()
            .find_map(|name| request.headers().get(*name))
            .and_then(|value| value.to_str().ok());

        match incoming {
            Some(id) => Self(id.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Middleware to log HTTP requests and responses.
pub async fn log_request(mut request: Request, next: Next) -> Response<Body> {
    let trace_id = TraceId::for_request(&request);
    request.extensions_mut().insert(trace_id.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = tracing::info_span!("http_request", trace_id = %trace_id, method = %method, path = %path);
    let started = Instant::now();

    tracing::debug!(parent: &span, query = request.uri().query().unwrap_or("-"), "Request received");

    let mut response = {
        let _guard = span.enter();
        next.run(request).await
    };

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match response.status() {
        s if s.is_server_error() => tracing::error!(
            parent: &span, status, latency_ms = %format!("{latency_ms:.2}"), "Request failed"
        ),
        s if s.is_client_error() => tracing::warn!(
            parent: &span, status, latency_ms = %format!("{latency_ms:.2}"), "Request rejected"
        ),
        _ => tracing::info!(
            parent: &span, status, latency_ms = %format!("{latency_ms:.2}"), "Request completed"
        ),
    }

    if let Ok(value) = HeaderValue::from_str(&trace_id.0) {
        let headers = response.headers_mut();
        headers.insert(TRACE_ID_HEADER, value.clone());
        headers.insert(REQUEST_ID_HEADER, value);
    }

    response
}
