//! Auth endpoints: register, login, logout
//!
//! Successful register/login responses carry the session token both in the
//! JSON body and as an HttpOnly `token` cookie.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use crate::config::Settings;
use crate::db::models::{User, UserRole};
use crate::db::repositories::is_unique_violation;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::schemas::{LoginRequest, MessageResponse, RegisterRequest, TokenResponse};
use crate::server::state::AppState;
use crate::utils::{hash_password, issue_token, verify_password};

/// POST /api/v1/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let role = payload.role.unwrap_or(UserRole::User);
    let email = payload.email.trim().to_lowercase();
    let digest = hash_password(&payload.password);

    let user = state
        .users
        .create(payload.name.trim(), &email, &digest, role)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Email is already registered".to_string())
            } else {
                ApiError::from(e)
            }
        })?;

    tracing::info!(user_id = %user.id, role = %user.role, "Account registered");

    session_response(&state.settings, user, StatusCode::CREATED)
}

/// POST /api/v1/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();

    // One message for unknown email and wrong password.
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_digest) {
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "Login succeeded");

    session_response(&state.settings, user, StatusCode::OK)
}

/// GET /api/v1/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %user.id, "Logout");

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(&state.settings)?)],
        Json(MessageResponse::new("Logged out")),
    ))
}

fn session_response(
    settings: &Settings,
    user: User,
    status: StatusCode,
) -> Result<impl IntoResponse, ApiError> {
    let token = issue_token(
        &settings.jwt_secret,
        user.id,
        user.role,
        settings.jwt_expires_days,
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;

    let cookie = session_cookie(settings, &token)?;

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(TokenResponse {
            success: true,
            token,
            user: user.into(),
        }),
    ))
}

fn session_cookie(settings: &Settings, token: &str) -> Result<HeaderValue, ApiError> {
    let max_age = settings.cookie_expires_days * 24 * 60 * 60;
    let mut cookie = format!(
        "token={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age
    );
    if settings.is_production() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("invalid session cookie")))
}

pub(crate) fn clear_session_cookie(settings: &Settings) -> Result<HeaderValue, ApiError> {
    let mut cookie = "token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0".to_string();
    if settings.is_production() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("invalid session cookie")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let settings = Settings::default();
        let cookie = session_cookie(&settings, "abc").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_secure_in_production() {
        let mut settings = Settings::default();
        settings.environment = crate::config::Environment::Production;
        let cookie = session_cookie(&settings, "abc").unwrap();
        assert!(cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&Settings::default()).unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
    }
}
