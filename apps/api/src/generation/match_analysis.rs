//! Résumé-to-job match analysis.
//!
//! The model's JSON is never trusted for field presence. A missing, null or
//! non-numeric score becomes 0; numeric scores are rounded and clamped into
//! 0..=100. Missing lists become empty and missing advice becomes "".
//! Only output that is not JSON at all is an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generation::prompts::match_prompt;
use crate::llm_client::{parse_json, GenerateRequest, LlmClient, LlmError, Part, REASONING_MODEL};
use crate::models::Resume;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchAnalysis {
    pub score: u8,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub advice: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMatch {
    score: Value,
    strengths: Value,
    gaps: Value,
    advice: Value,
}

impl MatchAnalysis {
    /// Normalizes the model's raw JSON into a well-formed result.
    pub fn from_model_output(text: &str) -> Result<Self, LlmError> {
        let value: Value = parse_json(text)?;
        let raw: RawMatch = match value {
            Value::Object(_) => serde_json::from_value(value)?,
            _ => RawMatch::default(),
        };
        Ok(Self {
            score: normalize_score(&raw.score),
            strengths: string_list(raw.strengths),
            gaps: string_list(raw.gaps),
            advice: match raw.advice {
                Value::String(s) => s,
                _ => String::new(),
            },
        })
    }
}

fn normalize_score(value: &Value) -> u8 {
    let score = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub async fn analyze_job_match(
    llm: &LlmClient,
    resume: &Resume,
    job_description: &str,
) -> Result<MatchAnalysis, LlmError> {
    let resume_json = serde_json::to_string(resume)?;
    let prompt = match_prompt(&resume_json, job_description);
    let request = GenerateRequest::user(vec![Part::text(prompt)]).with_json_output(None);
    let response = llm.generate(REASONING_MODEL, &request).await?;
    MatchAnalysis::from_model_output(&response.text())
}
