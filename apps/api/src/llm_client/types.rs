//! Gemini `generateContent` request and response bodies.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::LlmError;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    /// Single-turn request holding one user message.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content::user(parts)],
            ..Self::default()
        }
    }

    /// Asks for `application/json` output, optionally constrained by `schema`.
    pub fn with_json_output(mut self, schema: Option<Value>) -> Self {
        let config = self.generation_config.get_or_insert_with(Default::default);
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = schema;
        self
    }

    pub fn with_google_search(mut self) -> Self {
        self.tools.push(Tool::google_search());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Some("model".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    /// System instructions carry no role.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn image(image: &InlineImage) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.data),
            }),
        }
    }
}

/// Base64 payload as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub google_search: Value,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate; empty when there is none.
    pub fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    pub fn inline_data(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }

    /// Title of each grounding chunk, in order. Chunks without a web title
    /// keep their slot as `None`.
    pub fn grounding_titles(&self) -> Vec<Option<String>> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| {
                m.grounding_chunks
                    .iter()
                    .map(|chunk| chunk.web.as_ref().and_then(|w| w.title.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Decoded image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Bytes,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_inline_data(inline: &InlineData) -> Result<Self, LlmError> {
        let data = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| LlmError::InvalidImage(e.to_string()))?;
        Ok(Self::new(inline.mime_type.clone(), data))
    }

    /// Parses `data:<mime>;base64,<payload>`.
    pub fn from_data_url(url: &str) -> Result<Self, LlmError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| LlmError::InvalidImage("not a data URL".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| LlmError::InvalidImage("data URL has no payload".to_string()))?;
        let mime_type = meta
            .strip_suffix(";base64")
            .ok_or_else(|| LlmError::InvalidImage("data URL is not base64".to_string()))?;
        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| LlmError::InvalidImage(e.to_string()))?;
        Ok(Self::new(mime_type, data))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}
