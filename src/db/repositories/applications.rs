//! Application repository
//!
//! Data access layer for job applications.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Application, Job};

/// Repository for application rows.
#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an application. Applying twice to the same job surfaces as a
    /// unique-violation database error.
    pub async fn create(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        resume: &str,
    ) -> Result<Application, sqlx::Error> {
        sqlx::query_as::<_, Application>(
            "INSERT INTO applications (job_id, user_id, resume) \
             VALUES ($1, $2, $3) \
             RETURNING *",
        )
        .bind(job_id)
        .bind(user_id)
        .bind(resume)
        .fetch_one(&self.pool)
        .await
    }

    /// All applications for one posting (used to clean up stored resumes
    /// before the posting is deleted).
    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<Application>, sqlx::Error> {
        sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE job_id = $1 ORDER BY applied_at DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Jobs the user has applied to, most recent application first.
    pub async fn jobs_applied_by(&self, user_id: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            "SELECT j.* FROM jobs j \
             JOIN applications a ON a.job_id = j.id \
             WHERE a.user_id = $1 \
             ORDER BY a.applied_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
