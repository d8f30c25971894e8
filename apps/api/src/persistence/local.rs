//! Local fallback used when no hosted database is configured.
//!
//! Each user gets a directory under the store root holding two fixed keys,
//! `jobflow_jobs` and `jobflow_resume`, stored as JSON text files. Writes go
//! through a uniquely named temp file and a rename so a crash never leaves
//! half a document, and every write holds the store's write lock.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Job, JobPatch, Resume};
use crate::persistence::{Persistence, PersistenceError};

pub const JOBS_KEY: &str = "jobflow_jobs";
pub const RESUME_KEY: &str = "jobflow_resume";

pub struct LocalPersistence {
    root: PathBuf,
    /// Serializes every write, including job read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl LocalPersistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, user_id: &str, key: &str) -> PathBuf {
        self.root
            .join(sanitize_segment(user_id))
            .join(format!("{key}.json"))
    }

    async fn get(&self, user_id: &str, key: &str) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(self.key_path(user_id, key)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, user_id: &str, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.key_path(user_id, key);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!("Wrote {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    async fn read_jobs(&self, user_id: &str) -> Result<Vec<Job>, PersistenceError> {
        match self.get(user_id, JOBS_KEY).await? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_jobs(&self, user_id: &str, jobs: &[Job]) -> Result<(), PersistenceError> {
        let text = serde_json::to_string(jobs)?;
        self.set(user_id, JOBS_KEY, &text).await
    }
}

/// Keeps user ids from escaping the store root.
fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl Persistence for LocalPersistence {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn fetch_jobs(&self, user_id: &str) -> Result<Vec<Job>, PersistenceError> {
        self.read_jobs(user_id).await
    }

    async fn fetch_resume(&self, user_id: &str) -> Result<Option<Resume>, PersistenceError> {
        match self.get(user_id, RESUME_KEY).await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn insert_job(&self, user_id: &str, job: &Job) -> Result<Option<Job>, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.read_jobs(user_id).await?;
        jobs.retain(|j| j.id != job.id);
        jobs.insert(0, job.clone());
        self.write_jobs(user_id, &jobs).await?;
        Ok(None)
    }

    async fn update_job(
        &self,
        user_id: &str,
        job_id: &str,
        patch: &JobPatch,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.read_jobs(user_id).await?;
        let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) else {
            debug!("Job {job_id} not present in local store; nothing to update");
            return Ok(());
        };
        patch.apply_to(job);
        self.write_jobs(user_id, &jobs).await
    }

    async fn delete_job(&self, user_id: &str, job_id: &str) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.read_jobs(user_id).await?;
        let before = jobs.len();
        jobs.retain(|j| j.id != job_id);
        if jobs.len() == before {
            return Ok(());
        }
        self.write_jobs(user_id, &jobs).await
    }

    async fn upsert_resume(&self, user_id: &str, resume: &Resume) -> Result<(), PersistenceError> {
        let text = serde_json::to_string(resume)?;
        let _guard = self.write_lock.lock().await;
        self.set(user_id, RESUME_KEY, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::ResumeExperience;
    use crate::models::JobStatus;

    fn job(id: &str, company: &str) -> Job {
        Job {
            id: id.to_string(),
            company: company.to_string(),
            role: "Engineer".to_string(),
            ..Job::default()
        }
    }

    #[tokio::test]
    async fn test_missing_keys_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPersistence::new(dir.path());
        assert!(store.fetch_jobs("u1").await.unwrap().is_empty());
        assert!(store.fetch_resume("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_jobs_insert_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPersistence::new(dir.path());

        assert!(store.insert_job("u1", &job("a", "Acme")).await.unwrap().is_none());
        store.insert_job("u1", &job("b", "Globex")).await.unwrap();

        let patch = JobPatch {
            status: Some(JobStatus::Interview),
            ..JobPatch::default()
        };
        store.update_job("u1", "a", &patch).await.unwrap();
        store.delete_job("u1", "b").await.unwrap();

        let jobs = store.fetch_jobs("u1").await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "a");
        assert_eq!(jobs[0].status, JobStatus::Interview);
    }

    #[tokio::test]
    async fn test_resume_round_trip_and_fixed_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPersistence::new(dir.path());
        let resume = Resume {
            full_name: "Sam".to_string(),
            avatar: Some("data:image/png;base64,AAAA".to_string()),
            experience: vec![ResumeExperience {
                id: "x".to_string(),
                role: "Engineer".to_string(),
                ..ResumeExperience::default()
            }],
            ..Resume::default()
        };
        store.upsert_resume("u1", &resume).await.unwrap();

        assert!(dir.path().join("u1").join("jobflow_resume.json").exists());
        assert_eq!(store.fetch_resume("u1").await.unwrap(), Some(resume));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resume_writes_leave_a_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(LocalPersistence::new(dir.path()));
        let long = Resume {
            summary: "x".repeat(20_000),
            ..Resume::default()
        };
        let short = Resume {
            summary: "short text".to_string(),
            ..Resume::default()
        };

        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let resume = if i % 2 == 0 { long.clone() } else { short.clone() };
            tasks.push(tokio::spawn(async move {
                let mut failures = 0;
                for _ in 0..25 {
                    if store.upsert_resume("u1", &resume).await.is_err() {
                        failures += 1;
                    }
                }
                failures
            }));
        }
        let mut failures = 0;
        for task in tasks {
            failures += task.await.unwrap();
        }
        assert_eq!(failures, 0);

        let stored = store.fetch_resume("u1").await.unwrap().unwrap();
        assert!(stored == long || stored == short);

        let leftovers = std::fs::read_dir(dir.path().join("u1"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPersistence::new(dir.path());
        store.insert_job("u1", &job("a", "Acme")).await.unwrap();
        assert!(store.fetch_jobs("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalPersistence::new(dir.path());
        store.set("u1", JOBS_KEY, "{not json").await.unwrap();
        assert!(matches!(
            store.fetch_jobs("u1").await,
            Err(PersistenceError::Serde(_))
        ));
    }

    #[test]
    fn test_sanitize_segment_blocks_traversal() {
        assert_eq!(sanitize_segment("../etc"), "___etc");
        assert_eq!(sanitize_segment("abc-123_x"), "abc-123_x");
        assert_eq!(sanitize_segment(""), "_");
    }
}
