// All LLM prompt text for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

use serde_json::Value;

use crate::llm_client::prompts::{array, boolean, object, string, JSON_ONLY_INSTRUCTION};

/// Persona for the coach chat session.
pub const COACH_PERSONA: &str = "You are Claire, a career coach helper.";

pub const DEFAULT_AVATAR_STYLE: &str = "Professional corporate headshot.";

pub const RESUME_EXTRACTION_PROMPT: &str = "Extract resume data to JSON schema.";

pub fn cover_letter_prompt(
    role: &str,
    company: &str,
    skills: &str,
    description: Option<&str>,
) -> String {
    let mut prompt =
        format!("Write a professional cover letter for {role} at {company}. Skills: {skills}.");
    if let Some(jd) = description.filter(|d| !d.trim().is_empty()) {
        prompt.push_str(&format!(" JD: {jd}"));
    }
    prompt
}

pub fn interview_guide_prompt(role: &str, company: &str, description: Option<&str>) -> String {
    format!(
        "Career coach guide for {role} at {company}. Format the guide as markdown. Context: {}",
        description.unwrap_or_default()
    )
}

pub fn summary_prompt(role: &str, skills: &str, experience: &str) -> String {
    format!("Resume summary for {role}. Skills: {skills}. Exp: {experience}")
}

pub fn enhance_prompt(text: &str) -> String {
    format!("Rewrite impactfully: \"{text}\"")
}

/// `resume_json` is the serialized résumé document.
pub fn match_prompt(resume_json: &str, job_description: &str) -> String {
    format!(
        r#"Compare this resume with the following job description.
Provide a JSON response with:
1. "score": number (0-100)
2. "strengths": string[] (matching skills/experience)
3. "gaps": string[] (missing keywords or skills)
4. "advice": string (how to improve the resume for this specific JD)

{JSON_ONLY_INSTRUCTION}

Resume: {resume_json}
Job Description: {job_description}"#
    )
}

pub fn opportunities_prompt(skills: &str, location: &str) -> String {
    format!(
        "Find 5 current, high-quality job openings for someone with these skills: {skills}. \
         Preferred location: {location}. For each job, provide: Title, Company, Location, and a \
         brief \"Match Reason\". Include the direct application URL."
    )
}

pub fn opportunities_schema() -> Value {
    array(object(
        &[
            ("title", string()),
            ("company", string()),
            ("location", string()),
            ("url", string()),
            ("source", string()),
            ("matchReason", string()),
        ],
        &["title", "company", "url", "matchReason"],
    ))
}

pub fn resume_extraction_schema() -> Value {
    let experience = object(
        &[
            ("role", string()),
            ("company", string()),
            ("location", string()),
            ("startDate", string()),
            ("endDate", string()),
            ("current", boolean()),
            ("description", string()),
        ],
        &[],
    );
    let education = object(
        &[
            ("degree", string()),
            ("school", string()),
            ("location", string()),
            ("startDate", string()),
            ("endDate", string()),
        ],
        &[],
    );
    let project = object(
        &[
            ("name", string()),
            ("description", string()),
            ("techStack", string()),
        ],
        &[],
    );
    object(
        &[
            ("fullName", string()),
            ("email", string()),
            ("phone", string()),
            ("location", string()),
            ("linkedin", string()),
            ("website", string()),
            ("summary", string()),
            ("skills", string()),
            ("experience", array(experience)),
            ("education", array(education)),
            ("projects", array(project)),
        ],
        &[],
    )
}

/// Prefixes a coach message with the user's job statistics.
pub fn coach_message(stats_context: &str, user_message: &str) -> String {
    format!("[System Context: {stats_context}]\n\nUser Query: {user_message}")
}
