//! Claire, the career-coach chat.
//!
//! The chat session starts uninitialized and becomes active on the first
//! message; it then lives as long as its workspace. Each turn streams text
//! fragments that are folded into the running transcript as they arrive.

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::generation::prompts::{coach_message, COACH_PERSONA};
use crate::llm_client::{ChatSession, LlmClient, LlmError, TextStream, TEXT_MODEL};

pub const GREETING: &str = "Hi! I'm Claire, your AI career companion. I can help with resume \
    tips, interview prep, or just analyzing your job search progress. How can I help today?";

pub const APOLOGY: &str = "I'm having a little trouble connecting right now. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Progress of one turn, forwarded to whoever is listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoachEvent {
    Chunk(String),
    /// The turn failed; carries the message appended to the transcript.
    Apology(String),
    Done,
}

pub struct Coach {
    /// `None` until the first message is sent.
    chat: Option<ChatSession>,
    transcript: Vec<ChatMessage>,
}

impl Default for Coach {
    fn default() -> Self {
        Self {
            chat: None,
            transcript: vec![ChatMessage::model(GREETING)],
        }
    }
}

impl Coach {
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_active(&self) -> bool {
        self.chat.is_some()
    }

    /// Runs one turn. The user's job statistics are prefixed to the message
    /// the model sees; the transcript records only what the user typed.
    pub async fn send(
        &mut self,
        llm: &LlmClient,
        stats_context: &str,
        user_message: &str,
        events: &mpsc::Sender<CoachEvent>,
    ) {
        self.transcript.push(ChatMessage::user(user_message));
        let prompt = coach_message(stats_context, user_message);

        let session = self
            .chat
            .get_or_insert_with(|| ChatSession::new(llm.clone(), TEXT_MODEL, COACH_PERSONA));
        let opened = session.send_message_stream(&prompt).await;
        match opened {
            Ok(stream) => self.consume(&prompt, stream, events).await,
            Err(e) => self.apologize(e, events).await,
        }
    }

    async fn consume(&mut self, prompt: &str, mut stream: TextStream, events: &mpsc::Sender<CoachEvent>) {
        self.transcript.push(ChatMessage::model(""));
        let mut reply = String::new();

        while let Some(fragment) = stream.next().await {
            match fragment {
                Ok(text) => {
                    reply.push_str(&text);
                    if let Some(last) = self.transcript.last_mut() {
                        last.text.push_str(&text);
                    }
                    if events.send(CoachEvent::Chunk(text)).await.is_err() {
                        debug!("Coach listener went away; stopping turn early");
                        return;
                    }
                }
                Err(e) => {
                    if reply.is_empty() {
                        self.transcript.pop();
                    }
                    self.apologize(e, events).await;
                    return;
                }
            }
        }

        if let Some(session) = self.chat.as_mut() {
            session.commit_turn(prompt, &reply);
        }
        let _ = events.send(CoachEvent::Done).await;
    }

    async fn apologize(&mut self, error: LlmError, events: &mpsc::Sender<CoachEvent>) {
        warn!("Coach turn failed: {error}");
        self.transcript.push(ChatMessage::model(APOLOGY));
        let _ = events.send(CoachEvent::Apology(APOLOGY.to_string())).await;
    }
}
