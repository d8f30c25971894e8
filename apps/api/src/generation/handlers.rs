//! Axum route handlers for the AI features.

use std::convert::Infallible;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::generation::avatar::transform_avatar;
use crate::generation::coach::{ChatMessage, CoachEvent};
use crate::generation::match_analysis::{analyze_job_match, MatchAnalysis};
use crate::generation::opportunities::{find_matching_jobs, JobOpportunity};
use crate::generation::resume_import::extract_resume;
use crate::generation::writing::{
    enhance_description, generate_cover_letter, generate_interview_guide,
    generate_resume_summary,
};
use crate::llm_client::InlineImage;
use crate::models::{Job, JobPatch, Resume, ResumeSection};
use crate::state::{AppState, Workspace};
use crate::store::stats::job_stats_context;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterRequest {
    pub role: String,
    pub company: String,
    /// Defaults to the résumé's skills.
    pub skills: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub job_description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpportunitiesRequest {
    pub skills: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvatarRequest {
    /// Portrait as a `data:` URL; defaults to the current résumé avatar.
    pub image: Option<String>,
    pub style: Option<String>,
    /// Store the result as the résumé avatar.
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

#[derive(Debug, Deserialize)]
pub struct CoachMessageRequest {
    pub message: String,
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn find_job(workspace: &Workspace, id: &str) -> Result<Job, AppError> {
    workspace
        .store
        .job(id)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// Writes `patch` into job `id` and returns the updated entry.
fn apply_job_patch(workspace: &Workspace, id: &str, patch: JobPatch) -> Result<Job, AppError> {
    workspace.store.update_job(id, patch)?;
    find_job(workspace, id)
}

// ────────────────────────────────────────────────────────────────────────────
// Job-scoped generation
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:id/cover-letter
///
/// Generates a cover letter from the job and the résumé skills and stores it
/// on the job.
pub async fn handle_job_cover_letter(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Job>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    let job = find_job(&workspace, &id)?;
    let skills = workspace.store.resume().skills;

    let letter = generate_cover_letter(
        &state.llm,
        &job.role,
        &job.company,
        &skills,
        Some(job.description.as_str()),
    )
    .await?;

    let patch = JobPatch {
        cover_letter: Some(letter),
        ..JobPatch::default()
    };
    Ok(Json(apply_job_patch(&workspace, &id, patch)?))
}

/// POST /api/v1/jobs/:id/interview-guide
pub async fn handle_job_interview_guide(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Job>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    let job = find_job(&workspace, &id)?;

    let guide = generate_interview_guide(
        &state.llm,
        &job.role,
        &job.company,
        Some(job.description.as_str()),
    )
    .await?;

    let patch = JobPatch {
        interview_guide: Some(guide),
        ..JobPatch::default()
    };
    Ok(Json(apply_job_patch(&workspace, &id, patch)?))
}

// ────────────────────────────────────────────────────────────────────────────
// Résumé generation
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resume/summary
///
/// Regenerates the résumé summary from the most recent role, skills and
/// experience entries.
pub async fn handle_resume_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Resume>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    let resume = workspace.store.resume();

    let summary = generate_resume_summary(
        &state.llm,
        resume.current_role(),
        &resume.skills,
        &resume.experience_narrative(),
    )
    .await?;

    let (updated, _) = workspace.store.edit_resume(|r| {
        r.summary = summary;
        r.clone()
    });
    Ok(Json(updated))
}

/// POST /api/v1/resume/import
///
/// Multipart upload with a `file` field holding an image or PDF of a résumé.
pub async fn handle_resume_import(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Resume>, AppError> {
    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Uploaded file has no content type".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;
        document = Some(InlineImage::new(mime_type, data));
    }
    let document =
        document.ok_or_else(|| AppError::Validation("A 'file' field is required".to_string()))?;
    if document.data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let workspace = state.workspace(&user.session).await?;
    let extracted = extract_resume(&state.llm, &document).await?;
    workspace.store.import_resume(extracted);
    Ok(Json(workspace.store.resume()))
}

/// POST /api/v1/resume/:section/:id/enhance
///
/// Rewrites one entry's description in place.
pub async fn handle_enhance_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path((section, id)): Path<(ResumeSection, String)>,
) -> Result<Json<Resume>, AppError> {
    if section == ResumeSection::Education {
        return Err(AppError::Validation(
            "Education entries have no description to enhance".to_string(),
        ));
    }
    let workspace = state.workspace(&user.session).await?;
    let mut resume = workspace.store.resume();
    let original = resume
        .entry_description_mut(section, &id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Résumé entry {id} not found")))?;
    require_text(&original, "description")?;

    let enhanced = enhance_description(&state.llm, &original).await?;

    let (updated, _) = workspace.store.edit_resume(|r| {
        if let Some(description) = r.entry_description_mut(section, &id) {
            *description = enhanced;
        }
        r.clone()
    });
    Ok(Json(updated))
}

// ────────────────────────────────────────────────────────────────────────────
// Stateless AI calls
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CoverLetterRequest>,
) -> Result<Json<TextResponse>, AppError> {
    require_text(&request.role, "role")?;
    require_text(&request.company, "company")?;
    let skills = match request.skills {
        Some(skills) => skills,
        None => state.workspace(&user.session).await?.store.resume().skills,
    };

    let text = generate_cover_letter(
        &state.llm,
        &request.role,
        &request.company,
        &skills,
        request.description.as_deref(),
    )
    .await?;
    Ok(Json(TextResponse { text }))
}

/// POST /api/v1/ai/match
///
/// Scores the stored résumé against a job description.
pub async fn handle_match(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchAnalysis>, AppError> {
    require_text(&request.job_description, "jobDescription")?;
    let resume = state.workspace(&user.session).await?.store.resume();
    let analysis = analyze_job_match(&state.llm, &resume, &request.job_description).await?;
    Ok(Json(analysis))
}

/// POST /api/v1/ai/opportunities
///
/// Skills and location default to the résumé's.
pub async fn handle_opportunities(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<OpportunitiesRequest>,
) -> Result<Json<Vec<JobOpportunity>>, AppError> {
    let resume = state.workspace(&user.session).await?.store.resume();
    let skills = request.skills.unwrap_or(resume.skills);
    let location = request.location.unwrap_or(resume.location);
    require_text(&skills, "skills")?;

    let found = find_matching_jobs(&state.llm, &skills, &location).await?;
    Ok(Json(found))
}

/// POST /api/v1/ai/enhance
pub async fn handle_enhance(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<EnhanceRequest>,
) -> Result<Json<TextResponse>, AppError> {
    require_text(&request.text, "text")?;
    let text = enhance_description(&state.llm, &request.text).await?;
    Ok(Json(TextResponse { text }))
}

/// POST /api/v1/ai/avatar
pub async fn handle_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AvatarRequest>,
) -> Result<Json<AvatarResponse>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    let source = request
        .image
        .or_else(|| workspace.store.resume().avatar)
        .ok_or_else(|| AppError::Validation("An image is required".to_string()))?;
    let portrait = InlineImage::from_data_url(&source)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let generated = transform_avatar(&state.llm, &portrait, request.style.as_deref()).await?;
    let avatar = generated.to_data_url();

    if request.save {
        let saved = avatar.clone();
        workspace.store.edit_resume(|r| r.avatar = Some(saved));
    }
    Ok(Json(AvatarResponse { avatar }))
}

/// POST /api/v1/opportunities/track
///
/// Adds a discovered opportunity to the applications list, dated today.
pub async fn handle_track_opportunity(
    State(state): State<AppState>,
    user: AuthUser,
    Json(opportunity): Json<JobOpportunity>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let workspace = state.workspace(&user.session).await?;
    let mut job = opportunity.into_job(Utc::now().date_naive());
    job.id = Uuid::new_v4().to_string();
    let id = job.id.clone();
    workspace.store.add_job(job)?;
    Ok((StatusCode::CREATED, Json(find_job(&workspace, &id)?)))
}

// ────────────────────────────────────────────────────────────────────────────
// Coach chat
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/coach/transcript
pub async fn handle_coach_transcript(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let workspace = state.workspace(&user.session).await?;
    let transcript = workspace.coach.lock().await.transcript().to_vec();
    Ok(Json(transcript))
}

/// POST /api/v1/coach/messages
///
/// Streams the reply as server-sent events: `chunk` for each fragment, then
/// `done`, or a single `apology` if the turn fails.
pub async fn handle_coach_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CoachMessageRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    require_text(&request.message, "message")?;
    let workspace = state.workspace(&user.session).await?;
    let (tx, rx) = mpsc::channel(32);

    let llm = state.llm.clone();
    tokio::spawn(async move {
        let stats = job_stats_context(&workspace.store.jobs());
        let mut coach = workspace.coach.lock().await;
        coach.send(&llm, &stats, &request.message, &tx).await;
    });

    let events = stream::unfold(rx, |mut rx| async move {
        let event = match rx.recv().await? {
            CoachEvent::Chunk(text) => Event::default().event("chunk").data(text),
            CoachEvent::Apology(text) => Event::default().event("apology").data(text),
            CoachEvent::Done => Event::default().event("done").data(""),
        };
        Some((Ok(event), rx))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
