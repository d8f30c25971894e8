use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Pipeline stage of a tracked job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Applied,
    Interview,
    Offer,
    Accepted,
    Rejected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interview => "Interview",
            JobStatus::Offer => "Offer",
            JobStatus::Accepted => "Accepted",
            JobStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Applied" => Ok(JobStatus::Applied),
            "Interview" => Ok(JobStatus::Interview),
            "Offer" => Ok(JobStatus::Offer),
            "Accepted" => Ok(JobStatus::Accepted),
            "Rejected" => Ok(JobStatus::Rejected),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// How an entry entered the tracker. Independent of its current status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOrigin {
    #[default]
    Application,
    Offer,
}

impl JobOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOrigin::Application => "application",
            JobOrigin::Offer => "offer",
        }
    }
}

impl FromStr for JobOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(JobOrigin::Application),
            "offer" => Ok(JobOrigin::Offer),
            other => Err(format!("unknown job origin '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Job {
    pub id: String,
    pub company: String,
    pub role: String,
    pub status: JobStatus,
    pub salary: String,
    pub location: String,
    pub date_applied: Option<NaiveDate>,
    pub description: String,
    pub cover_letter: String,
    pub origin: JobOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_guide: Option<String>,
}

impl Job {
    /// Offer view: logged as an offer, or an application that reached `Offer`.
    pub fn in_offer_view(&self) -> bool {
        self.origin == JobOrigin::Offer || self.status == JobStatus::Offer
    }

    pub fn in_application_view(&self) -> bool {
        self.origin == JobOrigin::Application && self.status != JobStatus::Offer
    }

    pub fn matches_origin(&self, origin: JobOrigin) -> bool {
        match origin {
            JobOrigin::Offer => self.in_offer_view(),
            JobOrigin::Application => self.in_application_view(),
        }
    }

    /// Company and role are the only required fields.
    pub fn validate(&self) -> Result<(), String> {
        if self.company.trim().is_empty() || self.role.trim().is_empty() {
            return Err("Company and Role are required.".to_string());
        }
        Ok(())
    }
}

/// Partial update of a job entry. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_applied: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<JobOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_guide: Option<String>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self == &JobPatch::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        let blanked = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
        if blanked(&self.company) || blanked(&self.role) {
            return Err("Company and Role are required.".to_string());
        }
        Ok(())
    }

    /// Merges the supplied fields into `job`.
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(v) = &self.company {
            job.company = v.clone();
        }
        if let Some(v) = &self.role {
            job.role = v.clone();
        }
        if let Some(v) = self.status {
            job.status = v;
        }
        if let Some(v) = &self.salary {
            job.salary = v.clone();
        }
        if let Some(v) = &self.location {
            job.location = v.clone();
        }
        if let Some(v) = self.date_applied {
            job.date_applied = Some(v);
        }
        if let Some(v) = &self.description {
            job.description = v.clone();
        }
        if let Some(v) = &self.cover_letter {
            job.cover_letter = v.clone();
        }
        if let Some(v) = self.origin {
            job.origin = v;
        }
        if let Some(v) = &self.interview_guide {
            job.interview_guide = Some(v.clone());
        }
    }
}
