use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::llm_client::LlmError;
use crate::persistence::PersistenceError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Auth provider error: {0}")]
    AuthProvider(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn unauthenticated() -> Self {
        AppError::Unauthorized("Authentication required".to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => AppError::Validation(msg),
            StoreError::DuplicateId(_) => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                AppError::Unauthorized(e.to_string())
            }
            AuthError::EmailTaken | AuthError::ConfirmationRequired => {
                AppError::Conflict(e.to_string())
            }
            AuthError::Provider { .. } | AuthError::Http(_) | AuthError::Hash(_) => {
                AppError::AuthProvider(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "Could not load your data. Please try again.".to_string(),
                )
            }
            AppError::Llm(LlmError::MissingApiKey) => {
                tracing::error!("LLM error: {}", LlmError::MissingApiKey);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AI_NOT_CONFIGURED",
                    "AI features are not configured on this server".to_string(),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred. Please try again.".to_string(),
                )
            }
            AppError::AuthProvider(msg) => {
                tracing::error!("Auth provider error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "AUTH_PROVIDER_ERROR",
                    "Authentication service is unavailable".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: impl Into<AppError>) -> StatusCode {
        e.into().into_response().status()
    }

    #[test]
    fn test_store_errors_map_to_client_errors() {
        assert_eq!(
            status_of(StoreError::Validation("Company and Role are required.".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StoreError::DuplicateId("j1".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_auth_errors_map_by_kind() {
        assert_eq!(status_of(AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::EmailTaken), StatusCode::CONFLICT);
        assert_eq!(
            status_of(AuthError::Validation("Name is required".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_llm_errors_hide_details() {
        assert_eq!(status_of(LlmError::MissingApiKey), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(LlmError::NoImage), StatusCode::BAD_GATEWAY);
    }
}
