pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::generation::handlers as ai;
use crate::state::AppState;
use crate::store::handlers as store;

/// Résumé uploads are images or PDFs sent inline to the model.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/signup", post(auth::handle_signup))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/me", get(auth::handle_me))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(store::handle_list_jobs).post(store::handle_create_job),
        )
        .route(
            "/api/v1/jobs/:id",
            patch(store::handle_update_job).delete(store::handle_delete_job),
        )
        .route("/api/v1/jobs/:id/cover-letter", post(ai::handle_job_cover_letter))
        .route(
            "/api/v1/jobs/:id/interview-guide",
            post(ai::handle_job_interview_guide),
        )
        // Résumé
        .route(
            "/api/v1/resume",
            get(store::handle_get_resume).put(store::handle_put_resume),
        )
        .route("/api/v1/resume/summary", post(ai::handle_resume_summary))
        .route(
            "/api/v1/resume/import",
            post(ai::handle_resume_import).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/resume/:section/:id",
            delete(store::handle_delete_resume_entry),
        )
        .route(
            "/api/v1/resume/:section/:id/move",
            post(store::handle_move_resume_entry),
        )
        .route(
            "/api/v1/resume/:section/:id/enhance",
            post(ai::handle_enhance_entry),
        )
        // Stateless AI
        .route("/api/v1/ai/cover-letter", post(ai::handle_cover_letter))
        .route("/api/v1/ai/match", post(ai::handle_match))
        .route("/api/v1/ai/opportunities", post(ai::handle_opportunities))
        .route("/api/v1/ai/enhance", post(ai::handle_enhance))
        .route(
            "/api/v1/ai/avatar",
            post(ai::handle_avatar).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/v1/opportunities/track", post(ai::handle_track_opportunity))
        .route("/api/v1/dashboard", get(store::handle_dashboard))
        // Coach
        .route("/api/v1/coach/transcript", get(ai::handle_coach_transcript))
        .route("/api/v1/coach/messages", post(ai::handle_coach_message))
        .with_state(state)
}
