//! User and auth endpoint schemas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::models::{User, UserRole};

/// Account fields safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Response wrapping a single account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: PublicUser,
}

impl UserResponse {
    pub fn new(user: impl Into<PublicUser>) -> Self {
        Self {
            success: true,
            user: user.into(),
        }
    }
}

/// Payload for `POST /api/v1/register`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 60, message = "name must be 1-60 characters"))]
    pub name: String,

    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,

    /// Defaults to `user` when absent.
    pub role: Option<UserRole>,
}

/// Payload for `POST /api/v1/login`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Response for register and login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

/// Payload for `PUT /api/v1/me`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 60, message = "name must be 1-60 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
}

/// Payload for `PUT /api/v1/me/password`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "current_password must not be empty"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "new_password must be at least 8 characters"))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let req = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.test".into(),
            password: "correct-horse".into(),
            role: None,
        };
        assert!(req.validate().is_ok());

        let req = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.test".into(),
            password: "short".into(),
            role: Some(UserRole::Employer),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_public_user_has_no_digest() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.test".into(),
            password_digest: "salt$digest".into(),
            role: UserRole::User,
            created_at: Utc::now(),
        };
        let body = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(body.get("password_digest").is_none());
        assert_eq!(body["role"], "user");
    }
}
