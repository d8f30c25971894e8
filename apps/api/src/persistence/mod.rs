//! Durable storage behind the job store.
//!
//! Two backends share the `Persistence` trait: PostgreSQL for the hosted
//! deployment and a directory of JSON files for the local variant. The store
//! holds an `Arc<dyn Persistence>` picked at startup from `Config`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Job, JobPatch, Resume};

pub mod local;
pub mod mapping;
pub mod postgres;

pub use local::LocalPersistence;
pub use postgres::PgPersistence;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait Persistence: Send + Sync {
    /// Short label for logs.
    fn backend_name(&self) -> &'static str;

    async fn fetch_jobs(&self, user_id: &str) -> Result<Vec<Job>, PersistenceError>;

    /// `Ok(None)` means the user has no résumé yet.
    async fn fetch_resume(&self, user_id: &str) -> Result<Option<Resume>, PersistenceError>;

    /// Stores a new entry. Backends that assign server-side fields return the
    /// canonical record; others return `Ok(None)`.
    async fn insert_job(&self, user_id: &str, job: &Job) -> Result<Option<Job>, PersistenceError>;

    /// Writes only the fields present in `patch`.
    async fn update_job(
        &self,
        user_id: &str,
        job_id: &str,
        patch: &JobPatch,
    ) -> Result<(), PersistenceError>;

    async fn delete_job(&self, user_id: &str, job_id: &str) -> Result<(), PersistenceError>;

    async fn upsert_resume(&self, user_id: &str, resume: &Resume) -> Result<(), PersistenceError>;
}
