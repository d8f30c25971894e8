//! Axum route handlers for jobs, the résumé document and the dashboard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{Job, JobOrigin, JobPatch, Resume, ResumeSection};
use crate::state::AppState;
use crate::store::stats::DashboardStats;

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub origin: Option<JobOrigin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEntryRequest {
    pub to_index: usize,
}

/// GET /api/v1/jobs
///
/// All jobs, or the application / offer view when `?origin=` is given.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    let jobs = match query.origin {
        Some(origin) => workspace.store.jobs_by_origin(origin),
        None => workspace.store.jobs(),
    };
    Ok(Json(jobs))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut job): Json<Job>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let workspace = state.workspace(&user.session).await?;
    if job.id.trim().is_empty() {
        job.id = Uuid::new_v4().to_string();
    }
    let id = job.id.clone();
    workspace.store.add_job(job)?;

    let created = workspace
        .store
        .job(&id)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<Job>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    if workspace.store.job(&id).is_none() {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    workspace.store.update_job(&id, patch)?;

    let updated = workspace
        .store
        .job(&id)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(updated))
}

/// DELETE /api/v1/jobs/:id
///
/// Unknown ids succeed without effect.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let workspace = state.workspace(&user.session).await?;
    workspace.store.delete_job(&id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/resume
pub async fn handle_get_resume(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Resume>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    Ok(Json(workspace.store.resume()))
}

/// PUT /api/v1/resume
///
/// Replaces the whole document. List entries sent without a unique id get
/// one, and an empty avatar is cleared.
pub async fn handle_put_resume(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut resume): Json<Resume>,
) -> Result<Json<Resume>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    resume.normalize();
    workspace.store.update_resume(resume.clone());
    Ok(Json(resume))
}

/// POST /api/v1/resume/:section/:id/move
pub async fn handle_move_resume_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path((section, id)): Path<(ResumeSection, String)>,
    Json(request): Json<MoveEntryRequest>,
) -> Result<Json<Resume>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    let (moved, _) = workspace.store.edit_resume_if(|resume| {
        resume
            .move_entry(section, &id, request.to_index)
            .then(|| resume.clone())
    });
    moved
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Résumé entry {id} not found")))
}

/// DELETE /api/v1/resume/:section/:id
pub async fn handle_delete_resume_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path((section, id)): Path<(ResumeSection, String)>,
) -> Result<StatusCode, AppError> {
    let workspace = state.workspace(&user.session).await?;
    workspace
        .store
        .edit_resume_if(|resume| resume.remove_entry(section, &id).then_some(()));
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardStats>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    let jobs = workspace.store.jobs();
    Ok(Json(DashboardStats::compute(&jobs, Utc::now().date_naive())))
}
