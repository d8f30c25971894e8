//! Portrait restyling into a headshot.

use crate::generation::prompts::DEFAULT_AVATAR_STYLE;
use crate::llm_client::{GenerateRequest, InlineImage, LlmClient, LlmError, Part, IMAGE_MODEL};

/// Sends `portrait` with a style instruction and returns the first image
/// part of the reply. A blank style falls back to [`DEFAULT_AVATAR_STYLE`].
pub async fn transform_avatar(
    llm: &LlmClient,
    portrait: &InlineImage,
    style: Option<&str>,
) -> Result<InlineImage, LlmError> {
    let style = style
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_AVATAR_STYLE);
    let request = GenerateRequest::user(vec![Part::image(portrait), Part::text(style)]);
    let response = llm.generate(IMAGE_MODEL, &request).await?;

    let inline = response.inline_data().ok_or(LlmError::NoImage)?;
    InlineImage::from_inline_data(inline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::{text_reply, MockGemini, Reply};
    use serde_json::json;

    fn portrait() -> InlineImage {
        InlineImage::new("image/jpeg", vec![0xFFu8, 0xD8, 0xFF])
    }

    #[tokio::test]
    async fn test_returns_first_image_part() {
        let mock = MockGemini::start(Reply::Json(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here you go"},
                {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
            ]}}]
        })))
        .await;

        let image = transform_avatar(&mock.client, &portrait(), None).await.unwrap();
        assert_eq!(image, InlineImage::new("image/png", vec![1u8, 2, 3]));

        let requests = mock.requests();
        assert!(requests[0].path.starts_with(IMAGE_MODEL));
        assert_eq!(
            requests[0].body["contents"][0]["parts"][1]["text"],
            DEFAULT_AVATAR_STYLE
        );
    }

    #[tokio::test]
    async fn test_custom_style_is_sent() {
        let mock = MockGemini::start(Reply::Json(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AQID"}}]}}]
        })))
        .await;
        transform_avatar(&mock.client, &portrait(), Some("Watercolor portrait"))
            .await
            .unwrap();
        assert_eq!(
            mock.last_body()["contents"][0]["parts"][1]["text"],
            "Watercolor portrait"
        );
    }

    #[tokio::test]
    async fn test_text_only_reply_is_an_error() {
        let mock = MockGemini::start(Reply::Json(text_reply("I cannot edit photos."))).await;
        let result = transform_avatar(&mock.client, &portrait(), None).await;
        assert!(matches!(result, Err(LlmError::NoImage)));
    }
}
