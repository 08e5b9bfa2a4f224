//! Database row models
//!
//! This module defines the structs mapped from PostgreSQL rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account role. Employers publish jobs, users apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    User,
    Employer,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Employer => write!(f, "employer"),
        }
    }
}

/// Employment type of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "job_type", rename_all = "lowercase")]
pub enum JobType {
    Permanent,
    Temporary,
    Internship,
}

/// Account row, stored in the `users` table.
///
/// The password digest never serializes into responses.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Job posting row, stored in the `jobs` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company: String,
    pub contact_email: String,
    pub address: String,
    pub job_type: JobType,
    pub positions: i32,
    pub salary: i64,
    pub last_date: DateTime<Utc>,
    pub posted_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// A job accepts applications until its last application date.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.last_date > now
    }
}

/// Application row linking a user to a job, with the stored resume file name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub resume: String,
    pub applied_at: DateTime<Utc>,
}

/// Aggregate row produced by the stats query.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobStats {
    pub total_jobs: i64,
    pub avg_salary: f64,
    pub min_salary: i64,
    pub max_salary: i64,
    pub total_positions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Employer).unwrap(), "\"employer\"");
        assert_eq!(
            serde_json::from_str::<JobType>("\"internship\"").unwrap(),
            JobType::Internship
        );
    }

    #[test]
    fn test_job_open_window() {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            description: "Build APIs".into(),
            company: "Acme".into(),
            contact_email: "hiring@acme.test".into(),
            address: "Remote".into(),
            job_type: JobType::Permanent,
            positions: 2,
            salary: 90_000,
            last_date: now + Duration::days(7),
            posted_by: Uuid::new_v4(),
            created_at: now,
        };
        assert!(job.is_open(now));
        assert!(!job.is_open(now + Duration::days(8)));
    }
}
