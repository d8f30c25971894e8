//! Opportunity radar: web-search grounded job discovery.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::generation::prompts::{opportunities_prompt, opportunities_schema};
use crate::llm_client::{parse_json, GenerateRequest, LlmClient, LlmError, Part, REASONING_MODEL};
use crate::models::{Job, JobOrigin, JobStatus};

pub const FALLBACK_SOURCE: &str = "Web Search";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobOpportunity {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub source: String,
    pub match_reason: String,
}

impl JobOpportunity {
    /// A fresh application entry for this opportunity, dated `today`.
    pub fn into_job(self, today: NaiveDate) -> Job {
        Job {
            company: self.company,
            role: self.title,
            status: JobStatus::Applied,
            location: self.location,
            date_applied: Some(today),
            description: format!(
                "Discovered via Opportunity Radar.\nSource: {}\nAI Match Reason: {}",
                self.source, self.match_reason
            ),
            origin: JobOrigin::Application,
            ..Job::default()
        }
    }
}

/// Fills blank sources from the grounding chunk at the same index, then
/// from [`FALLBACK_SOURCE`].
pub fn backfill_sources(opportunities: &mut [JobOpportunity], chunk_titles: &[Option<String>]) {
    for (i, opportunity) in opportunities.iter_mut().enumerate() {
        if !opportunity.source.trim().is_empty() {
            continue;
        }
        opportunity.source = chunk_titles
            .get(i)
            .and_then(|t| t.as_deref())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(FALLBACK_SOURCE)
            .to_string();
    }
}

pub async fn find_matching_jobs(
    llm: &LlmClient,
    skills: &str,
    location: &str,
) -> Result<Vec<JobOpportunity>, LlmError> {
    let request = GenerateRequest::user(vec![Part::text(opportunities_prompt(skills, location))])
        .with_json_output(Some(opportunities_schema()))
        .with_google_search();
    let response = llm.generate(REASONING_MODEL, &request).await?;

    let mut opportunities: Vec<JobOpportunity> = parse_json(&response.text())?;
    backfill_sources(&mut opportunities, &response.grounding_titles());
    Ok(opportunities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::{MockGemini, Reply};
    use serde_json::json;

    fn opportunity(source: &str) -> JobOpportunity {
        JobOpportunity {
            title: "Rust Engineer".to_string(),
            company: "Acme".to_string(),
            source: source.to_string(),
            ..JobOpportunity::default()
        }
    }

    #[test]
    fn test_backfill_prefers_model_source_then_chunk_then_fallback() {
        let mut found = vec![opportunity("Company site"), opportunity(""), opportunity(" ")];
        let titles = vec![Some("LinkedIn".to_string()), Some("Indeed".to_string())];
        backfill_sources(&mut found, &titles);

        assert_eq!(found[0].source, "Company site");
        assert_eq!(found[1].source, "Indeed");
        assert_eq!(found[2].source, FALLBACK_SOURCE);
    }

    #[test]
    fn test_backfill_skips_untitled_chunks() {
        let mut found = vec![opportunity("")];
        backfill_sources(&mut found, &[None]);
        assert_eq!(found[0].source, FALLBACK_SOURCE);
    }

    #[test]
    fn test_into_job_records_source_and_reason() {
        let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let job = JobOpportunity {
            location: "Remote".to_string(),
            source: "LinkedIn".to_string(),
            match_reason: "Strong Rust overlap".to_string(),
            ..opportunity("LinkedIn")
        }
        .into_job(today);

        assert_eq!(job.company, "Acme");
        assert_eq!(job.role, "Rust Engineer");
        assert_eq!(job.status, JobStatus::Applied);
        assert_eq!(job.origin, JobOrigin::Application);
        assert_eq!(job.date_applied, Some(today));
        assert_eq!(
            job.description,
            "Discovered via Opportunity Radar.\nSource: LinkedIn\nAI Match Reason: Strong Rust overlap"
        );
        assert!(job.validate().is_ok());
    }

    #[tokio::test]
    async fn test_grounded_call_backfills_from_metadata() {
        let results = json!([
            {"title": "Backend Engineer", "company": "Globex", "url": "https://globex/jobs/1", "matchReason": "Rust"},
            {"title": "SRE", "company": "Initech", "url": "https://initech/jobs/2", "source": "Careers page", "matchReason": "Ops"}
        ]);
        let mock = MockGemini::start(Reply::Json(json!({
            "candidates": [{
                "content": {"parts": [{"text": results.to_string()}]},
                "groundingMetadata": {"groundingChunks": [{"web": {"title": "Glassdoor"}}]}
            }]
        })))
        .await;

        let found = find_matching_jobs(&mock.client, "Rust", "Remote").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].source, "Glassdoor");
        assert_eq!(found[0].location, "");
        assert_eq!(found[1].source, "Careers page");

        let body = mock.last_body();
        assert_eq!(body["tools"][0], json!({"google_search": {}}));
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[tokio::test]
    async fn test_malformed_results_are_a_parse_error() {
        let mock = MockGemini::start(Reply::Json(
            crate::llm_client::mock::text_reply("Here are some jobs!"),
        ))
        .await;
        let result = find_matching_jobs(&mock.client, "Rust", "Remote").await;
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }
}
