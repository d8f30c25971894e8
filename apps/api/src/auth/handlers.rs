//! Axum route handlers for the Auth API.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::auth::{AuthSession, AuthUser, Credentials, SignupRequest};
use crate::errors::AppError;
use crate::models::UserSession;
use crate::state::AppState;

/// POST /api/v1/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    request.validate()?;
    let session = state.auth.signup(&request).await?;
    info!(
        "User {} signed up via {} auth",
        session.user.user_id,
        state.auth.name()
    );
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthSession>, AppError> {
    credentials.validate()?;
    let session = state.auth.login(&credentials).await?;
    Ok(Json(session))
}

/// POST /api/v1/auth/logout
///
/// Ends the session and drops the user's in-memory workspace.
pub async fn handle_logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, AppError> {
    state.auth.logout(&user.token).await?;
    state.close_workspace(&user.session.user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(user: AuthUser) -> Json<UserSession> {
    Json(user.session)
}
