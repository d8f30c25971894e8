//! Authentication collaborator.
//!
//! The service treats auth as an opaque provider of signup, login, logout and
//! current-user lookups behind the [`AuthProvider`] trait. A GoTrue-compatible
//! hosted service is used when `AUTH_URL` is configured; otherwise the
//! in-process [`LocalAuth`] provider keeps Argon2id hashes and session tokens
//! in memory.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;
use crate::models::UserSession;
use crate::state::AppState;

pub mod handlers;
pub mod hosted;
pub mod local;
pub mod password;

pub use hosted::HostedAuth;
pub use local::LocalAuth;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid or expired session")]
    InvalidToken,

    #[error("Check your email to confirm your account before logging in")]
    ConfirmationRequired,

    #[error("Auth provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.name.trim().is_empty() {
            return Err(AuthError::Validation("Name is required".to_string()));
        }
        Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
        .validate()?;
        password::validate_password_strength(&self.password, MIN_PASSWORD_LENGTH)
            .map_err(AuthError::Validation)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), AuthError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation(
                "A valid email address is required".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub user: UserSession,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Callers validate the request first.
    async fn signup(&self, request: &SignupRequest) -> Result<AuthSession, AuthError>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, AuthError>;

    async fn logout(&self, token: &str) -> Result<(), AuthError>;

    async fn current_user(&self, token: &str) -> Result<UserSession, AuthError>;
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authenticated user resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub session: UserSession,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(AppError::unauthenticated)?;
        let session = state.auth.current_user(token).await?;
        Ok(AuthUser {
            session,
            token: token.to_string(),
        })
    }
}
