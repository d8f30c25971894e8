//! Translation between in-memory entities and durable records.
//!
//! Records mirror the table columns: every column but the keys is nullable,
//! enums are stored as text and the résumé lists live in `jsonb`. Reading a
//! record never fails; missing or unreadable values fall back to defaults.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::models::{Job, JobPatch, Resume};

pub const JOB_COLUMNS: &str = "id, user_id, company, role, status, salary, location, \
    date_applied, description, cover_letter, origin, interview_guide";

pub const RESUME_COLUMNS: &str = "user_id, full_name, email, phone, location, linkedin, \
    website, summary, skills, avatar, experience, education, projects";

#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct JobRecord {
    pub id: String,
    pub user_id: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub salary: Option<String>,
    pub location: Option<String>,
    pub date_applied: Option<NaiveDate>,
    pub description: Option<String>,
    pub cover_letter: Option<String>,
    pub origin: Option<String>,
    pub interview_guide: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct ResumeRecord {
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
    pub summary: Option<String>,
    pub skills: Option<String>,
    pub avatar: Option<String>,
    pub experience: Option<Value>,
    pub education: Option<Value>,
    pub projects: Option<Value>,
}

/// A single column assignment produced from a partial job update.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Date(NaiveDate),
}

pub fn job_from_record(record: JobRecord) -> Job {
    Job {
        id: record.id,
        company: record.company.unwrap_or_default(),
        role: record.role.unwrap_or_default(),
        status: record
            .status
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        salary: record.salary.unwrap_or_default(),
        location: record.location.unwrap_or_default(),
        date_applied: record.date_applied,
        description: record.description.unwrap_or_default(),
        cover_letter: record.cover_letter.unwrap_or_default(),
        origin: record
            .origin
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        interview_guide: record.interview_guide,
    }
}

pub fn job_to_record(user_id: &str, job: &Job) -> JobRecord {
    JobRecord {
        id: job.id.clone(),
        user_id: user_id.to_string(),
        company: Some(job.company.clone()),
        role: Some(job.role.clone()),
        status: Some(job.status.as_str().to_string()),
        salary: Some(job.salary.clone()),
        location: Some(job.location.clone()),
        date_applied: job.date_applied,
        description: Some(job.description.clone()),
        cover_letter: Some(job.cover_letter.clone()),
        origin: Some(job.origin.as_str().to_string()),
        interview_guide: job.interview_guide.clone(),
    }
}

/// An empty `avatar` column reads back as no avatar; [`resume_to_record`]
/// never writes one.
pub fn resume_from_record(record: ResumeRecord) -> Resume {
    Resume {
        full_name: record.full_name.unwrap_or_default(),
        email: record.email.unwrap_or_default(),
        phone: record.phone.unwrap_or_default(),
        location: record.location.unwrap_or_default(),
        linkedin: record.linkedin.unwrap_or_default(),
        website: record.website.unwrap_or_default(),
        summary: record.summary.unwrap_or_default(),
        skills: record.skills.unwrap_or_default(),
        avatar: record.avatar.filter(|a| !a.is_empty()),
        experience: list_from_value(record.experience),
        education: list_from_value(record.education),
        projects: list_from_value(record.projects),
    }
}

pub fn resume_to_record(user_id: &str, resume: &Resume) -> ResumeRecord {
    ResumeRecord {
        user_id: user_id.to_string(),
        full_name: Some(resume.full_name.clone()),
        email: Some(resume.email.clone()),
        phone: Some(resume.phone.clone()),
        location: Some(resume.location.clone()),
        linkedin: Some(resume.linkedin.clone()),
        website: Some(resume.website.clone()),
        summary: Some(resume.summary.clone()),
        skills: Some(resume.skills.clone()),
        avatar: resume.avatar.clone().filter(|a| !a.is_empty()),
        experience: Some(list_to_value(&resume.experience)),
        education: Some(list_to_value(&resume.education)),
        projects: Some(list_to_value(&resume.projects)),
    }
}

/// Column assignments for exactly the fields present in `patch`.
pub fn patch_columns(patch: &JobPatch) -> Vec<(&'static str, ColumnValue)> {
    let mut columns = Vec::new();
    let mut text = |name: &'static str, value: &Option<String>| {
        if let Some(v) = value {
            columns.push((name, ColumnValue::Text(v.clone())));
        }
    };
    text("company", &patch.company);
    text("role", &patch.role);
    text("status", &patch.status.map(|s| s.as_str().to_string()));
    text("salary", &patch.salary);
    text("location", &patch.location);
    text("description", &patch.description);
    text("cover_letter", &patch.cover_letter);
    text("origin", &patch.origin.map(|o| o.as_str().to_string()));
    text("interview_guide", &patch.interview_guide);
    if let Some(date) = patch.date_applied {
        columns.push(("date_applied", ColumnValue::Date(date)));
    }
    columns
}

fn list_from_value<T: DeserializeOwned>(value: Option<Value>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn list_to_value<T: Serialize>(items: &[T]) -> Value {
    serde_json::to_value(items).unwrap_or_else(|_| Value::Array(Vec::new()))
}
