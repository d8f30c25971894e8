//! Gemini gateway: every model call in JobFlow goes through [`LlmClient`].
//!
//! Calls are single-shot: failures propagate to the caller unchanged, with no
//! retry and no backoff. A missing API key is reported per call.

use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod chat;
pub mod prompts;
pub mod sse;
pub mod types;

pub use chat::ChatSession;
pub use types::{Content, GenerateRequest, GenerateResponse, InlineImage, Part};

use sse::SseDecoder;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fast model for free-text generation and chat.
pub const TEXT_MODEL: &str = "gemini-3-flash-preview";
/// Model for structured extraction, match analysis and grounded search.
pub const REASONING_MODEL: &str = "gemini-3-pro-preview";
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No image generated")]
    NoImage,

    #[error("Invalid image data: {0}")]
    InvalidImage(String),
}

/// A boxed stream of text fragments from a streamed call.
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// The single LLM client used by all services in JobFlow.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: Option<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn post(
        &self,
        model: &str,
        method: &str,
        request: &GenerateRequest,
    ) -> Result<reqwest::Response, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let url = format!("{}/models/{model}:{method}", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Makes a raw `generateContent` call, returning the full response object.
    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError> {
        let response: GenerateResponse = self
            .post(model, "generateContent", request)
            .await?
            .json()
            .await?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "LLM call succeeded: model={model}, prompt_tokens={}, candidate_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }
        Ok(response)
    }

    /// Plain-text generation. An empty reply is returned as an empty string.
    pub async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest::user(vec![Part::text(prompt)]);
        Ok(self.generate(model, &request).await?.text())
    }

    /// Requests JSON output and deserializes it into `T`.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        model: &str,
        parts: Vec<Part>,
        schema: Option<Value>,
    ) -> Result<T, LlmError> {
        let request = GenerateRequest::user(parts).with_json_output(schema);
        let response = self.generate(model, &request).await?;
        parse_json(&response.text())
    }

    /// Streams a request through `streamGenerateContent`, yielding each text
    /// fragment as it arrives.
    pub async fn stream(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<TextStream, LlmError> {
        let response = self
            .post(model, "streamGenerateContent?alt=sse", request)
            .await?;
        let bytes = response.bytes_stream().boxed();

        let state = (bytes, SseDecoder::default(), VecDeque::new(), false);
        let fragments = stream::unfold(state, |(mut bytes, mut decoder, mut ready, mut done)| async move {
            loop {
                if let Some(item) = ready.pop_front() {
                    return Some((item, (bytes, decoder, ready, done)));
                }
                if done {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => {
                        for event in decoder.push(&chunk) {
                            queue_fragment(&mut ready, &event);
                        }
                    }
                    Some(Err(e)) => {
                        ready.push_back(Err(LlmError::Http(e)));
                        done = true;
                    }
                    None => {
                        if let Some(event) = decoder.finish() {
                            queue_fragment(&mut ready, &event);
                        }
                        done = true;
                    }
                }
            }
        });
        Ok(fragments.boxed())
    }
}

fn queue_fragment(ready: &mut VecDeque<Result<String, LlmError>>, event: &str) {
    match serde_json::from_str::<GenerateResponse>(event) {
        Ok(response) => {
            let text = response.text();
            if !text.is_empty() {
                ready.push_back(Ok(text));
            }
        }
        Err(e) => ready.push_back(Err(LlmError::Parse(e))),
    }
}

/// Parses model JSON output, tolerating markdown code fences.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    serde_json::from_str(text).map_err(LlmError::Parse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Loopback HTTP server standing in for the Gemini endpoint.
#[cfg(test)]
pub(crate) mod mock {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use serde_json::Value;

    use super::LlmClient;

    #[derive(Clone)]
    pub enum Reply {
        Json(Value),
        Sse(String),
        Error(StatusCode, Value),
    }

    #[derive(Debug, Clone)]
    pub struct Captured {
        pub path: String,
        pub api_key: Option<String>,
        pub body: Value,
    }

    #[derive(Clone)]
    struct MockState {
        reply: Reply,
        captured: Arc<Mutex<Vec<Captured>>>,
    }

    pub struct MockGemini {
        pub client: LlmClient,
        captured: Arc<Mutex<Vec<Captured>>>,
    }

    impl MockGemini {
        pub async fn start(reply: Reply) -> Self {
            let captured = Arc::new(Mutex::new(Vec::new()));
            let state = MockState {
                reply,
                captured: captured.clone(),
            };
            let app = Router::new()
                .route("/v1beta/models/:call", post(handle))
                .with_state(state);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            let client = LlmClient::new(Some("test-key".to_string()))
                .unwrap()
                .with_base_url(format!("http://{addr}/v1beta"));
            Self { client, captured }
        }

        pub fn requests(&self) -> Vec<Captured> {
            self.captured.lock().unwrap().clone()
        }

        pub fn last_body(&self) -> Value {
            self.requests().last().map(|c| c.body.clone()).unwrap_or_default()
        }
    }

    async fn handle(
        State(state): State<MockState>,
        Path(call): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        state.captured.lock().unwrap().push(Captured {
            path: call,
            api_key: headers
                .get("x-goog-api-key")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });
        match state.reply {
            Reply::Json(value) => Json(value).into_response(),
            Reply::Sse(body) => ([("content-type", "text/event-stream")], body).into_response(),
            Reply::Error(status, value) => (status, Json(value)).into_response(),
        }
    }

    /// A `generateContent` body whose single candidate says `text`.
    pub fn text_reply(text: &str) -> Value {
        serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{text_reply, MockGemini, Reply};
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_json_rejects_empty_and_garbage() {
        assert!(matches!(
            parse_json::<Value>("  "),
            Err(LlmError::EmptyContent)
        ));
        assert!(matches!(
            parse_json::<Value>("not json"),
            Err(LlmError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_at_call_time() {
        let client = LlmClient::new(None).unwrap();
        assert!(!client.has_api_key());
        let result = client.generate_text(TEXT_MODEL, "hello").await;
        assert!(matches!(result, Err(LlmError::MissingApiKey)));

        let blank = LlmClient::new(Some("  ".to_string())).unwrap();
        assert!(!blank.has_api_key());
    }

    #[tokio::test]
    async fn test_generate_text_sends_key_and_prompt() {
        let mock = MockGemini::start(Reply::Json(text_reply("Dear hiring manager"))).await;
        let text = mock.client.generate_text(TEXT_MODEL, "Write it").await.unwrap();

        assert_eq!(text, "Dear hiring manager");
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].path,
            format!("{TEXT_MODEL}:generateContent")
        );
        assert_eq!(requests[0].api_key.as_deref(), Some("test-key"));
        assert_eq!(
            requests[0].body["contents"][0]["parts"][0]["text"],
            "Write it"
        );
    }

    #[tokio::test]
    async fn test_api_error_surfaces_status_and_message() {
        let mock = MockGemini::start(Reply::Error(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}),
        ))
        .await;
        let result = mock.client.generate_text(TEXT_MODEL, "x").await;
        match result {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "Quota exceeded");
            }
            other => panic!("expected API error, got {other:?}"),
        }
        // No retry.
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_json_requests_json_mime_type() {
        let mock = MockGemini::start(Reply::Json(text_reply("```json\n{\"a\": 1}\n```"))).await;
        let value: Value = mock
            .client
            .generate_json(REASONING_MODEL, vec![Part::text("go")], None)
            .await
            .unwrap();

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(
            mock.last_body()["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_in_order() {
        let body = [
            format!("data: {}\r\n\r\n", text_reply("Hel")),
            format!("data: {}\r\n\r\n", text_reply("lo")),
            format!("data: {}\r\n\r\n", json!({"candidates": []})),
        ]
        .concat();
        let mock = MockGemini::start(Reply::Sse(body)).await;

        let request = GenerateRequest::user(vec![Part::text("hi")]);
        let fragments: Vec<String> = mock
            .client
            .stream(TEXT_MODEL, &request)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["Hel", "lo"]);
        assert_eq!(
            mock.requests()[0].path,
            format!("{TEXT_MODEL}:streamGenerateContent")
        );
    }
}
