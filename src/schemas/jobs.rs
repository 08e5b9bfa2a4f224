//! Job endpoint schemas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::db::models::{Job, JobStats, JobType};

/// Payload for `POST /api/v1/jobs`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "description must be 1-5000 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 100, message = "company must be 1-100 characters"))]
    pub company: String,

    #[validate(email(message = "contact_email must be a valid email address"))]
    pub contact_email: String,

    #[validate(length(min = 1, max = 200, message = "address must be 1-200 characters"))]
    pub address: String,

    pub job_type: JobType,

    #[validate(range(min = 1, message = "positions must be at least 1"))]
    pub positions: i32,

    #[validate(range(min = 0, message = "salary must not be negative"))]
    pub salary: i64,

    #[validate(custom(function = validate_last_date))]
    pub last_date: DateTime<Utc>,
}

/// Payload for `PUT /api/v1/jobs/:id`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateJobRequest {
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "description must be 1-5000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 100, message = "company must be 1-100 characters"))]
    pub company: Option<String>,

    #[validate(email(message = "contact_email must be a valid email address"))]
    pub contact_email: Option<String>,

    #[validate(length(min = 1, max = 200, message = "address must be 1-200 characters"))]
    pub address: Option<String>,

    pub job_type: Option<JobType>,

    #[validate(range(min = 1, message = "positions must be at least 1"))]
    pub positions: Option<i32>,

    #[validate(range(min = 0, message = "salary must not be negative"))]
    pub salary: Option<i64>,

    #[validate(custom(function = validate_last_date))]
    pub last_date: Option<DateTime<Utc>>,
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobQuery {
    /// Case-insensitive title search.
    pub q: Option<String>,
    pub job_type: Option<JobType>,
    pub min_salary: Option<i64>,
    pub positions: Option<i32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Response for `GET /api/v1/jobs`.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub success: bool,
    /// Total matches before paging.
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    /// Number of jobs in this page.
    pub count: usize,
    pub jobs: Vec<Job>,
}

/// Response wrapping a single job.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub job: Job,
}

impl JobResponse {
    pub fn new(job: Job) -> Self {
        Self { success: true, job }
    }
}

/// Response for unpaginated job collections (my jobs, my applications).
#[derive(Debug, Serialize)]
pub struct JobCollectionResponse {
    pub success: bool,
    pub count: usize,
    pub jobs: Vec<Job>,
}

impl JobCollectionResponse {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            success: true,
            count: jobs.len(),
            jobs,
        }
    }
}

/// Response for `GET /api/v1/stats/:topic`.
#[derive(Debug, Serialize)]
pub struct JobStatsResponse {
    pub success: bool,
    pub topic: String,
    pub stats: JobStats,
}

/// Response for `POST /api/v1/jobs/:id/apply`.
#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub success: bool,
    pub message: String,
    /// Stored resume file name.
    pub resume: String,
}

fn validate_last_date(value: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *value <= Utc::now() {
        let mut err = ValidationError::new("last_date");
        err.message = Some("last application date must be in the future".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid_request() -> CreateJobRequest {
        CreateJobRequest {
            title: "Backend Engineer".into(),
            description: "Design and build the jobs API".into(),
            company: "Acme".into(),
            contact_email: "hiring@acme.test".into(),
            address: "12 Main St".into(),
            job_type: JobType::Permanent,
            positions: 2,
            salary: 90_000,
            last_date: Utc::now() + Duration::days(30),
        }
    }

    #[test]
    fn test_valid_create_request() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_email_and_positions() {
        let mut req = valid_request();
        req.contact_email = "not-an-email".into();
        req.positions = 0;
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("contact_email"));
        assert!(errors.field_errors().contains_key("positions"));
    }

    #[test]
    fn test_rejects_past_last_date() {
        let mut req = valid_request();
        req.last_date = Utc::now() - Duration::days(1);
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("last_date"));
    }

    #[test]
    fn test_empty_update_is_valid() {
        assert!(UpdateJobRequest::default().validate().is_ok());
    }

    #[test]
    fn test_update_checks_present_fields_only() {
        let req = UpdateJobRequest {
            title: Some(String::new()),
            ..Default::default()
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }
}
