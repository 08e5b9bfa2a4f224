//! User repository
//!
//! Data access layer for account operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{User, UserRole};

/// Repository for account rows.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account. A duplicate email surfaces as a
    /// unique-violation database error.
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_digest: &str,
        role: UserRole,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_digest, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(password_digest)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Update name and/or email; absent fields keep their current value.
    pub async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users \
             SET name = COALESCE($2, name), email = COALESCE($3, email) \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn update_password(
        &self,
        id: Uuid,
        password_digest: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_digest = $2 WHERE id = $1")
            .bind(id)
            .bind(password_digest)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete an account. Applications cascade at the schema level.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
