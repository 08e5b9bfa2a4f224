//! Middleware module
//!
//! Contains the HTTP middleware stack: request logging, security headers,
//! input sanitization, rate limiting, and authentication. The order the
//! layers are applied in is part of the server's contract and is declared
//! in `server::routes`.

pub mod auth;
pub mod logging;
pub mod rate_limit;
pub mod sanitize;
pub mod security;

// Re-export commonly used items
pub use auth::{require_auth, AuthState, CurrentUser};
pub use logging::{log_request, TraceId, REQUEST_ID_HEADER, TRACE_ID_HEADER};
pub use rate_limit::{rate_limit, RateLimitState};
pub use sanitize::sanitize_request;
pub use security::security_headers;
