//! User endpoints: profile, password, account deletion, my jobs

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use crate::api::auth::clear_session_cookie;
use crate::db::models::UserRole;
use crate::db::repositories::is_unique_violation;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::schemas::{
    JobCollectionResponse, MessageResponse, UpdateMeRequest, UpdatePasswordRequest, UserResponse,
};
use crate::server::state::AppState;
use crate::utils::{hash_password, verify_password};

/// GET /api/v1/me
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Json(UserResponse::new(user)))
}

/// PUT /api/v1/me
pub async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate()?;

    let email = payload.email.as_deref().map(|e| e.trim().to_lowercase());

    let user = state
        .users
        .update_profile(
            current.id,
            payload.name.as_deref().map(str::trim),
            email.as_deref(),
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Email is already registered".to_string())
            } else {
                ApiError::from(e)
            }
        })?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Json(UserResponse::new(user)))
}

/// PUT /api/v1/me/password
pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate()?;

    let user = state
        .users
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    if !verify_password(&payload.current_password, &user.password_digest) {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let digest = hash_password(&payload.new_password);
    state.users.update_password(current.id, &digest).await?;

    tracing::info!(user_id = %current.id, "Password updated");

    Ok(Json(MessageResponse::new("Password updated")))
}

/// DELETE /api/v1/me
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.users.delete(current.id).await?;
    if !deleted {
        return Err(ApiError::Unauthorized("Account no longer exists".to_string()));
    }

    tracing::info!(user_id = %current.id, "Account deleted");

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(&state.settings)?)],
        Json(MessageResponse::new("Account deleted")),
    ))
}

/// GET /api/v1/me/applications
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<JobCollectionResponse>, ApiError> {
    current.require_role(UserRole::User)?;

    let jobs = state.applications.jobs_applied_by(current.id).await?;
    Ok(Json(JobCollectionResponse::new(jobs)))
}

/// GET /api/v1/me/jobs
pub async fn my_jobs(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<JobCollectionResponse>, ApiError> {
    current.require_role(UserRole::Employer)?;

    let jobs = state.jobs.list_by_owner(current.id).await?;
    Ok(Json(JobCollectionResponse::new(jobs)))
}
