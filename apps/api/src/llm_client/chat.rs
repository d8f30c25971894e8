use crate::llm_client::{Content, GenerateRequest, LlmClient, LlmError, Part, TextStream};

/// Multi-turn conversation with a fixed system instruction.
///
/// A turn is committed to the history only once its reply is complete, so an
/// abandoned or failed stream leaves the history as it was.
#[derive(Clone)]
pub struct ChatSession {
    client: LlmClient,
    model: &'static str,
    system_instruction: String,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new(client: LlmClient, model: &'static str, system_instruction: impl Into<String>) -> Self {
        Self {
            client,
            model,
            system_instruction: system_instruction.into(),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    fn request_for(&self, message: &str) -> GenerateRequest {
        let mut contents = self.history.clone();
        contents.push(Content::user(vec![Part::text(message)]));
        GenerateRequest {
            contents,
            system_instruction: Some(Content::system(self.system_instruction.clone())),
            ..GenerateRequest::default()
        }
    }

    /// Opens a streamed reply to `message` given the history so far.
    pub async fn send_message_stream(&self, message: &str) -> Result<TextStream, LlmError> {
        self.client
            .stream(self.model, &self.request_for(message))
            .await
    }

    pub fn commit_turn(&mut self, message: &str, reply: &str) {
        self.history.push(Content::user(vec![Part::text(message)]));
        self.history.push(Content::model(reply));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::{text_reply, MockGemini, Reply};
    use crate::llm_client::TEXT_MODEL;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_request_carries_persona_and_history() {
        let body = format!("data: {}\n\n", text_reply("Sure."));
        let mock = MockGemini::start(Reply::Sse(body)).await;
        let mut chat = ChatSession::new(mock.client.clone(), TEXT_MODEL, "You are a coach.");
        chat.commit_turn("Hi", "Hello!");

        let reply: Vec<_> = chat
            .send_message_stream("Help me")
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(reply.len(), 1);

        let sent = mock.last_body();
        assert_eq!(sent["systemInstruction"]["parts"][0]["text"], "You are a coach.");
        let contents = sent["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Help me");
        // Sending does not commit the turn.
        assert_eq!(chat.history().len(), 2);
    }
}
