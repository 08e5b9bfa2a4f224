//! Job endpoints: listing, CRUD, applications, stats

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use std::path::Path as FsPath;
use uuid::Uuid;
use validator::Validate;

use crate::db::models::UserRole;
use crate::db::repositories::is_unique_violation;
use crate::db::repositories::jobs::{JobFilter, JobPatch, NewJob};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::schemas::{
    ApplyResponse, CreateJobRequest, JobListResponse, JobQuery, JobResponse, JobStatsResponse,
    MessageResponse, UpdateJobRequest,
};
use crate::server::state::AppState;

/// Resume file extensions accepted by the apply endpoint.
const ALLOWED_RESUME_EXTENSIONS: &[&str] = &["pdf", "docx"];

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// GET /api/v1/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Json<JobListResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let filter = JobFilter {
        q: query.q.clone().filter(|q| !q.is_empty()),
        job_type: query.job_type,
        min_salary: query.min_salary,
        positions: query.positions,
        limit: i64::from(limit),
        offset: i64::from(page - 1) * i64::from(limit),
    };

    let (jobs, total) = state.jobs.list(&filter).await?;

    Ok(Json(JobListResponse {
        success: true,
        total,
        page,
        limit,
        count: jobs.len(),
        jobs,
    }))
}

/// GET /api/v1/jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state
        .jobs
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    Ok(Json(JobResponse::new(job)))
}

/// POST /api/v1/jobs
pub async fn create_job(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    current.require_role(UserRole::Employer)?;
    payload.validate()?;

    let new_job = NewJob {
        title: payload.title.trim().to_string(),
        description: payload.description,
        company: payload.company,
        contact_email: payload.contact_email.to_lowercase(),
        address: payload.address,
        job_type: payload.job_type,
        positions: payload.positions,
        salary: payload.salary,
        last_date: payload.last_date,
    };

    let job = state.jobs.create(current.id, &new_job).await?;

    tracing::info!(job_id = %job.id, user_id = %current.id, "Job created");

    Ok((StatusCode::CREATED, Json(JobResponse::new(job))))
}

/// PUT /api/v1/jobs/:id
pub async fn update_job(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    payload.validate()?;

    let job = state
        .jobs
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    if job.posted_by != current.id {
        return Err(ApiError::Forbidden(
            "You can only modify your own job postings".to_string(),
        ));
    }

    let patch = JobPatch {
        title: payload.title.map(|t| t.trim().to_string()),
        description: payload.description,
        company: payload.company,
        contact_email: payload.contact_email.map(|e| e.to_lowercase()),
        address: payload.address,
        job_type: payload.job_type,
        positions: payload.positions,
        salary: payload.salary,
        last_date: payload.last_date,
    };

    let job = state
        .jobs
        .update(id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    Ok(Json(JobResponse::new(job)))
}

/// DELETE /api/v1/jobs/:id
pub async fn delete_job(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let job = state
        .jobs
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    if job.posted_by != current.id {
        return Err(ApiError::Forbidden(
            "You can only modify your own job postings".to_string(),
        ));
    }

    // Remove stored resumes before the rows cascade away.
    let applications = state.applications.list_for_job(id).await?;
    for application in &applications {
        let path = FsPath::new(&state.settings.upload_dir).join(&application.resume);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove resume");
        }
    }

    state.jobs.delete(id).await?;

    tracing::info!(job_id = %id, user_id = %current.id, "Job deleted");

    Ok(Json(MessageResponse::new("Job deleted")))
}

/// POST /api/v1/jobs/:id/apply
///
/// Multipart upload with a required `resume` part (.pdf or .docx).
pub async fn apply_to_job(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApplyResponse>), ApiError> {
    current.require_role(UserRole::User)?;

    let job = state
        .jobs
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    if !job.is_open(Utc::now()) {
        return Err(ApiError::BadRequest(
            "The application window for this job has closed".to_string(),
        ));
    }

    let (extension, data) = read_resume_part(&mut multipart, state.settings.max_upload_bytes).await?;

    let stored_name = format!(
        "resume-{}-{}.{}",
        current.id,
        Utc::now().timestamp_millis(),
        extension
    );

    tokio::fs::create_dir_all(&state.settings.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;
    let path = FsPath::new(&state.settings.upload_dir).join(&stored_name);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;

    let application = state
        .applications
        .create(id, current.id, &stored_name)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("You have already applied to this job".to_string())
            } else {
                ApiError::from(e)
            }
        });

    let application = match application {
        Ok(application) => application,
        Err(err) => {
            // The row was not recorded; don't keep the orphaned file.
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove resume");
            }
            return Err(err);
        }
    };

    tracing::info!(
        job_id = %id,
        user_id = %current.id,
        resume = %application.resume,
        "Application submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApplyResponse {
            success: true,
            message: "Application submitted".to_string(),
            resume: application.resume,
        }),
    ))
}

/// GET /api/v1/stats/:topic
pub async fn job_stats(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> Result<Json<JobStatsResponse>, ApiError> {
    let stats = state.jobs.stats(&topic).await?;

    if stats.total_jobs == 0 {
        return Err(ApiError::NotFound(format!("No stats found for {}", topic)));
    }

    Ok(Json(JobStatsResponse {
        success: true,
        topic,
        stats,
    }))
}

/// Pull the `resume` part out of the multipart body, enforcing extension
/// and size rules. Returns the lowercased extension and the file bytes.
async fn read_resume_part(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<(String, axum::body::Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("resume") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Resume file name is missing".to_string()))?;

        let extension = FsPath::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if !ALLOWED_RESUME_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiError::BadRequest(
                "Please upload a .pdf or .docx resume".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read resume: {}", e)))?;

        if data.is_empty() {
            return Err(ApiError::BadRequest("Resume file is empty".to_string()));
        }
        if data.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "Resume exceeds the {} byte limit",
                max_bytes
            )));
        }

        return Ok((extension, data));
    }

    Err(ApiError::BadRequest(
        "A 'resume' file part is required".to_string(),
    ))
}
