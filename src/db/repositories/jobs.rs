//! Job repository
//!
//! Data access layer for job postings: filtered listing, CRUD with
//! ownership, and the aggregate stats query.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::models::{Job, JobStats, JobType};

/// Fields for inserting a new posting.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub company: String,
    pub contact_email: String,
    pub address: String,
    pub job_type: JobType,
    pub positions: i32,
    pub salary: i64,
    pub last_date: DateTime<Utc>,
}

/// Partial update of a posting; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub job_type: Option<JobType>,
    pub positions: Option<i32>,
    pub salary: Option<i64>,
    pub last_date: Option<DateTime<Utc>>,
}

/// Listing filter; paging values are already clamped by the caller.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub q: Option<String>,
    pub job_type: Option<JobType>,
    pub min_salary: Option<i64>,
    pub positions: Option<i32>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for job postings.
#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, posted_by: Uuid, job: &NewJob) -> Result<Job, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs \
             (title, description, company, contact_email, address, job_type, \
              positions, salary, last_date, posted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING *",
        )
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.company)
        .bind(&job.contact_email)
        .bind(&job.address)
        .bind(job.job_type)
        .bind(job.positions)
        .bind(job.salary)
        .bind(job.last_date)
        .bind(posted_by)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List postings matching the filter, newest first, plus the total
    /// count of matches (before paging).
    pub async fn list(&self, filter: &JobFilter) -> Result<(Vec<Job>, i64), sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM jobs");
        Self::push_filter(&mut query, filter);
        query.push(" ORDER BY created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.offset);
        let jobs = query.build_query_as::<Job>().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs");
        Self::push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((jobs, total))
    }

    fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &JobFilter) {
        query.push(" WHERE TRUE");
        if let Some(q) = &filter.q {
            query.push(" AND title ILIKE ");
            query.push_bind(format!("%{}%", q));
        }
        if let Some(job_type) = filter.job_type {
            query.push(" AND job_type = ");
            query.push_bind(job_type);
        }
        if let Some(min_salary) = filter.min_salary {
            query.push(" AND salary >= ");
            query.push_bind(min_salary);
        }
        if let Some(positions) = filter.positions {
            query.push(" AND positions >= ");
            query.push_bind(positions);
        }
    }

    pub async fn update(&self, id: Uuid, patch: &JobPatch) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             company = COALESCE($4, company), \
             contact_email = COALESCE($5, contact_email), \
             address = COALESCE($6, address), \
             job_type = COALESCE($7, job_type), \
             positions = COALESCE($8, positions), \
             salary = COALESCE($9, salary), \
             last_date = COALESCE($10, last_date) \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.company)
        .bind(&patch.contact_email)
        .bind(&patch.address)
        .bind(patch.job_type)
        .bind(patch.positions)
        .bind(patch.salary)
        .bind(patch.last_date)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_by_owner(&self, posted_by: Uuid) -> Result<Vec<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE posted_by = $1 ORDER BY created_at DESC",
        )
        .bind(posted_by)
        .fetch_all(&self.pool)
        .await
    }

    /// Aggregate salary and headcount stats over postings whose title
    /// matches the topic. `total_jobs` is zero when nothing matches.
    pub async fn stats(&self, topic: &str) -> Result<JobStats, sqlx::Error> {
        sqlx::query_as::<_, JobStats>(
            "SELECT COUNT(*) AS total_jobs, \
             COALESCE(AVG(salary)::float8, 0) AS avg_salary, \
             COALESCE(MIN(salary), 0) AS min_salary, \
             COALESCE(MAX(salary), 0) AS max_salary, \
             COALESCE(SUM(positions)::bigint, 0) AS total_positions \
             FROM jobs WHERE title ILIKE $1",
        )
        .bind(format!("%{}%", topic))
        .fetch_one(&self.pool)
        .await
    }
}
