//! Authentication middleware
//!
//! Validates the session token (bearer header or `token` cookie), loads the
//! account, and injects [`CurrentUser`] into request extensions for
//! downstream handlers.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Settings;
use crate::db::models::UserRole;
use crate::db::UserRepository;
use crate::error::ApiError;
use crate::utils::{truncate_str, verify_token};

/// The authenticated account, injected into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Guard for role-restricted handlers.
    pub fn require_role(&self, role: UserRole) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "This route is restricted to {} accounts",
                role
            )))
        }
    }
}

/// Authentication state required by the middleware
#[derive(Clone)]
pub struct AuthState {
    pub settings: Arc<Settings>,
    pub users: UserRepository,
}

impl AuthState {
    pub fn new(settings: Arc<Settings>, users: UserRepository) -> Self {
        Self { settings, users }
    }
}

/// Middleware requiring a valid session token.
///
/// # Errors
/// - 401 Unauthorized: missing, invalid, or expired token; deleted account
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or_else(|| {
        ApiError::Unauthorized(
            "Missing authentication token. Provide 'Authorization: Bearer <token>' \
             or the 'token' cookie."
                .to_string(),
        )
    })?;

    let claims = verify_token(&auth.settings.jwt_secret, &token).map_err(|e| {
        tracing::debug!(
            token = %truncate_str(&token, 8),
            error = %e,
            "Token verification failed"
        );
        ApiError::Unauthorized("Invalid or expired authentication token".to_string())
    })?;

    let user = auth
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Pull the session token from the Authorization header or the `token`
/// cookie, in that order.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|v| !v.is_empty())
    {
        return Some(bearer.to_string());
    }

    cookie_value(headers, "token").filter(|v| !v.is_empty())
}

/// Read one cookie's value from the Cookie header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
