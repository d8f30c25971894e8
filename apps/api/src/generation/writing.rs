//! Free-text generation: cover letters, interview guides, summaries and
//! rewritten descriptions.

use crate::generation::prompts::{
    cover_letter_prompt, enhance_prompt, interview_guide_prompt, summary_prompt,
};
use crate::llm_client::{LlmClient, LlmError, TEXT_MODEL};

pub async fn generate_cover_letter(
    llm: &LlmClient,
    role: &str,
    company: &str,
    skills: &str,
    description: Option<&str>,
) -> Result<String, LlmError> {
    llm.generate_text(TEXT_MODEL, &cover_letter_prompt(role, company, skills, description))
        .await
}

/// Markdown preparation guide for an interview.
pub async fn generate_interview_guide(
    llm: &LlmClient,
    role: &str,
    company: &str,
    description: Option<&str>,
) -> Result<String, LlmError> {
    llm.generate_text(TEXT_MODEL, &interview_guide_prompt(role, company, description))
        .await
}

pub async fn generate_resume_summary(
    llm: &LlmClient,
    role: &str,
    skills: &str,
    experience: &str,
) -> Result<String, LlmError> {
    llm.generate_text(TEXT_MODEL, &summary_prompt(role, skills, experience))
        .await
}

/// Returns `text` unchanged when the model produces nothing.
pub async fn enhance_description(llm: &LlmClient, text: &str) -> Result<String, LlmError> {
    let rewritten = llm.generate_text(TEXT_MODEL, &enhance_prompt(text)).await?;
    if rewritten.trim().is_empty() {
        Ok(text.to_string())
    } else {
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::{text_reply, MockGemini, Reply};
    use serde_json::json;

    #[tokio::test]
    async fn test_cover_letter_returns_model_text() {
        let mock = MockGemini::start(Reply::Json(text_reply("Dear Acme team,"))).await;
        let letter = generate_cover_letter(&mock.client, "Engineer", "Acme", "Rust", None)
            .await
            .unwrap();
        assert_eq!(letter, "Dear Acme team,");
        let prompt = mock.last_body()["contents"][0]["parts"][0]["text"].clone();
        assert!(prompt.as_str().unwrap().contains("Engineer at Acme"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_empty_text() {
        let mock = MockGemini::start(Reply::Json(json!({"candidates": []}))).await;
        let guide = generate_interview_guide(&mock.client, "Engineer", "Acme", None)
            .await
            .unwrap();
        assert_eq!(guide, "");
    }

    #[tokio::test]
    async fn test_enhance_falls_back_to_original() {
        let mock = MockGemini::start(Reply::Json(text_reply("   "))).await;
        let text = enhance_description(&mock.client, "Fixed bugs").await.unwrap();
        assert_eq!(text, "Fixed bugs");
    }

    #[tokio::test]
    async fn test_enhance_uses_rewrite() {
        let mock = MockGemini::start(Reply::Json(text_reply("Resolved 40 defects"))).await;
        let text = enhance_description(&mock.client, "Fixed bugs").await.unwrap();
        assert_eq!(text, "Resolved 40 defects");
    }
}
