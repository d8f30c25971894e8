//! Read-only aggregates over a job collection.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::{Job, JobStatus};

pub const HISTORY_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyApplications {
    pub date: NaiveDate,
    pub applications: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_applied: usize,
    pub interviews: usize,
    /// `Offer` and `Accepted` together.
    pub offers: usize,
    pub pending: usize,
    /// Oldest day first, ending on `today`.
    pub history: Vec<DailyApplications>,
}

impl DashboardStats {
    pub fn compute(jobs: &[Job], today: NaiveDate) -> Self {
        let count = |pred: fn(JobStatus) -> bool| jobs.iter().filter(|j| pred(j.status)).count();

        let history = (0..HISTORY_DAYS)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                DailyApplications {
                    date,
                    applications: jobs
                        .iter()
                        .filter(|j| j.date_applied == Some(date))
                        .count(),
                }
            })
            .collect();

        Self {
            total_applied: jobs.len(),
            interviews: count(|s| s == JobStatus::Interview),
            offers: count(|s| matches!(s, JobStatus::Offer | JobStatus::Accepted)),
            pending: count(|s| s == JobStatus::Applied),
            history,
        }
    }
}

/// Stats block prepended to every coach message.
pub fn job_stats_context(jobs: &[Job]) -> String {
    let total = jobs.len();
    let interviews = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Interview)
        .count();
    let offers = jobs.iter().filter(|j| j.status == JobStatus::Offer).count();
    let conversion = if total > 0 {
        (interviews as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };

    format!(
        "Current Job Stats:\n\
         - Total Applications: {total}\n\
         - Interviews: {interviews}\n\
         - Offers: {offers}\n\
         - Interview Conversion Rate: {conversion}%"
    )
}
