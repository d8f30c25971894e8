//! Résumé extraction from an uploaded document image.

use crate::generation::prompts::{resume_extraction_schema, RESUME_EXTRACTION_PROMPT};
use crate::llm_client::{InlineImage, LlmClient, LlmError, Part, REASONING_MODEL};
use crate::models::ExtractedResume;

/// Identifiers are not part of the extraction; the store assigns them when
/// it merges the result.
pub async fn extract_resume(
    llm: &LlmClient,
    document: &InlineImage,
) -> Result<ExtractedResume, LlmError> {
    let parts = vec![Part::image(document), Part::text(RESUME_EXTRACTION_PROMPT)];
    llm.generate_json(REASONING_MODEL, parts, Some(resume_extraction_schema()))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::{text_reply, MockGemini, Reply};
    use serde_json::json;

    #[tokio::test]
    async fn test_extraction_sends_image_then_instruction() {
        let extracted = json!({
            "fullName": "Sam Rivera",
            "experience": [{"role": "Engineer", "company": "Acme", "current": true}]
        });
        let mock = MockGemini::start(Reply::Json(text_reply(&extracted.to_string()))).await;
        let document = InlineImage::new("image/png", vec![137u8, 80, 78, 71]);

        let result = extract_resume(&mock.client, &document).await.unwrap();
        assert_eq!(result.full_name.as_deref(), Some("Sam Rivera"));
        let experience = result.experience.unwrap();
        assert_eq!(experience.len(), 1);
        assert!(experience[0].id.is_empty());
        assert!(result.education.is_none());

        let parts = mock.last_body()["contents"][0]["parts"].clone();
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "iVBORw==");
        assert_eq!(parts[1]["text"], RESUME_EXTRACTION_PROMPT);
    }
}
