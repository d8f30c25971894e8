//! GoTrue-compatible hosted auth.
//!
//! Endpoints used: `/auth/v1/signup`, `/auth/v1/token?grant_type=password`,
//! `/auth/v1/logout` and `/auth/v1/user`. Every call carries the project key
//! in the `apikey` header; user-scoped calls add the bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::{AuthError, AuthProvider, AuthSession, Credentials, SignupRequest};
use crate::models::UserSession;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct HostedUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl HostedUser {
    fn into_session(self) -> UserSession {
        let name = ["name", "full_name"]
            .iter()
            .find_map(|key| self.user_metadata.get(key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        UserSession {
            user_id: self.id,
            name,
            email: self.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HostedSession {
    access_token: String,
    user: HostedUser,
}

/// Signup replies with a session when auto-confirm is on, or with the bare
/// user when email confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignupReply {
    Session(HostedSession),
    PendingConfirmation(HostedUser),
}

#[derive(Clone)]
pub struct HostedAuth {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HostedAuth {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{path}", self.base_url))
            .header("apikey", &self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AuthError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                ["msg", "error_description", "message"]
                    .iter()
                    .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or(body);
        debug!("Auth provider returned {status}: {message}");

        Err(match status.as_u16() {
            400 if message.to_lowercase().contains("invalid login") => {
                AuthError::InvalidCredentials
            }
            401 | 403 => AuthError::InvalidToken,
            422 if message.to_lowercase().contains("already registered") => AuthError::EmailTaken,
            code => AuthError::Provider {
                status: code,
                message,
            },
        })
    }
}

#[async_trait]
impl AuthProvider for HostedAuth {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn signup(&self, request: &SignupRequest) -> Result<AuthSession, AuthError> {
        let body = json!({
            "email": request.email.trim(),
            "password": request.password,
            "data": { "name": request.name.trim() },
        });
        let reply: SignupReply = self
            .send(self.request(reqwest::Method::POST, "signup").json(&body))
            .await?
            .json()
            .await?;

        match reply {
            SignupReply::Session(session) => Ok(AuthSession {
                access_token: session.access_token,
                user: session.user.into_session(),
            }),
            SignupReply::PendingConfirmation(user) => {
                debug!("Signup for {} awaits email confirmation", user.id);
                Err(AuthError::ConfirmationRequired)
            }
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        let body = json!({
            "email": credentials.email.trim(),
            "password": credentials.password,
        });
        let session: HostedSession = self
            .send(
                self.request(reqwest::Method::POST, "token")
                    .query(&[("grant_type", "password")])
                    .json(&body),
            )
            .await?
            .json()
            .await?;

        Ok(AuthSession {
            access_token: session.access_token,
            user: session.user.into_session(),
        })
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.send(self.request(reqwest::Method::POST, "logout").bearer_auth(token))
            .await?;
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<UserSession, AuthError> {
        let user: HostedUser = self
            .send(self.request(reqwest::Method::GET, "user").bearer_auth(token))
            .await?
            .json()
            .await?;
        Ok(user.into_session())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };

    async fn start(router: Router) -> HostedAuth {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        HostedAuth::new(format!("http://{addr}"), "anon-key").unwrap()
    }

    fn user_json() -> Value {
        json!({"id": "u-1", "email": "sam@example.com", "user_metadata": {"name": "Sam Rivera"}})
    }

    #[test]
    fn test_signup_reply_variants() {
        let with_session: SignupReply =
            serde_json::from_value(json!({"access_token": "t", "user": user_json()})).unwrap();
        assert!(matches!(with_session, SignupReply::Session(_)));

        let pending: SignupReply = serde_json::from_value(user_json()).unwrap();
        assert!(matches!(pending, SignupReply::PendingConfirmation(_)));
    }

    #[test]
    fn test_name_falls_back_to_full_name() {
        let user: HostedUser = serde_json::from_value(
            json!({"id": "u", "user_metadata": {"full_name": "Alex Developer"}}),
        )
        .unwrap();
        let session = user.into_session();
        assert_eq!(session.name, "Alex Developer");
        assert_eq!(session.email, "");
    }

    #[tokio::test]
    async fn test_login_and_current_user() {
        let router = Router::new()
            .route(
                "/auth/v1/token",
                post(|headers: HeaderMap| async move {
                    assert_eq!(headers["apikey"], "anon-key");
                    Json(json!({"access_token": "tok", "user": user_json()}))
                }),
            )
            .route(
                "/auth/v1/user",
                get(|headers: HeaderMap| async move {
                    if headers["authorization"] == "Bearer tok" {
                        Ok(Json(user_json()))
                    } else {
                        Err(StatusCode::UNAUTHORIZED)
                    }
                }),
            );
        let auth = start(router).await;

        let credentials = Credentials {
            email: "sam@example.com".to_string(),
            password: "secret-pass".to_string(),
        };
        let session = auth.login(&credentials).await.unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.user.name, "Sam Rivera");

        assert_eq!(auth.current_user("tok").await.unwrap().user_id, "u-1");
        assert!(matches!(
            auth.current_user("stale").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_invalid_login_maps_to_invalid_credentials() {
        let router = Router::new().route(
            "/auth/v1/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
                )
            }),
        );
        let auth = start(router).await;
        let credentials = Credentials {
            email: "sam@example.com".to_string(),
            password: "wrong".to_string(),
        };
        assert!(matches!(
            auth.login(&credentials).await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
