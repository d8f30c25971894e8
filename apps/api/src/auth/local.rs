//! In-process auth provider used when no hosted auth service is configured.
//!
//! Accounts and session tokens live in memory and vanish on restart. Job and
//! résumé data survive, since they are keyed by the user id derived from the
//! account email.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthError, AuthProvider, AuthSession, Credentials, SignupRequest};
use crate::models::UserSession;

struct LocalAccount {
    session: UserSession,
    password_hash: String,
}

#[derive(Default)]
pub struct LocalAuth {
    /// Keyed by normalized email.
    accounts: RwLock<HashMap<String, LocalAccount>>,
    /// Token → normalized email.
    tokens: RwLock<HashMap<String, String>>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Stable per-email id so local data is found again after a restart.
fn user_id_for(email: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, email.as_bytes()).to_string()
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

async fn run_blocking<T, F>(work: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, argon2::password_hash::Error> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
        .map_err(|e| AuthError::Hash(e.to_string()))
}

impl LocalAuth {
    pub fn new() -> Self {
        Self::default()
    }

    async fn issue_token(&self, email: &str) -> String {
        let token = new_token();
        self.tokens
            .write()
            .await
            .insert(token.clone(), email.to_string());
        token
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn signup(&self, request: &SignupRequest) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&request.email);
        if self.accounts.read().await.contains_key(&email) {
            return Err(AuthError::EmailTaken);
        }

        let password = request.password.clone();
        let password_hash = run_blocking(move || hash_password(&password)).await?;
        let session = UserSession {
            user_id: user_id_for(&email),
            name: request.name.trim().to_string(),
            email: email.clone(),
        };

        {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailTaken);
            }
            accounts.insert(
                email.clone(),
                LocalAccount {
                    session: session.clone(),
                    password_hash,
                },
            );
        }
        info!("Registered local account {}", session.user_id);

        Ok(AuthSession {
            access_token: self.issue_token(&email).await,
            user: session,
        })
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&credentials.email);
        let (session, password_hash) = {
            let accounts = self.accounts.read().await;
            let account = accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;
            (account.session.clone(), account.password_hash.clone())
        };

        let password = credentials.password.clone();
        let verified = run_blocking(move || verify_password(&password, &password_hash)).await?;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(AuthSession {
            access_token: self.issue_token(&email).await,
            user: session,
        })
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.tokens.write().await.remove(token);
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<UserSession, AuthError> {
        let email = self
            .tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)?;
        self.accounts
            .read()
            .await
            .get(&email)
            .map(|a| a.session.clone())
            .ok_or(AuthError::InvalidToken)
    }
}
