//! Application state store: the in-memory copy of one user's jobs and résumé.
//!
//! Every mutation is two-phase. The local commit happens synchronously under
//! the state lock, then the durable write is spawned as its own task and only
//! logs its outcome. A failed write never rolls back the local commit.
//!
//! Each mutating call hands back a [`PendingWrite`] for the spawned task.
//! Callers normally drop it; tests await it to observe the durable side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{ExtractedResume, Job, JobOrigin, JobPatch, JobStatus, Resume, UserSession};
use crate::persistence::{Persistence, PersistenceError};

pub mod handlers;
pub mod stats;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Job {0} already exists")]
    DuplicateId(String),
}

/// What to put in an account that has never been loaded before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Blank résumé carrying the user's name and email.
    #[default]
    Blank,
    /// Sample résumé and sample jobs.
    Demo,
}

/// Handle on a spawned durable write.
#[derive(Debug, Default)]
pub struct PendingWrite(Option<JoinHandle<()>>);

impl PendingWrite {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Waits for the write task to finish. Its own outcome was already logged.
    pub async fn settled(self) {
        if let Some(handle) = self.0 {
            if let Err(e) = handle.await {
                warn!("Durable write task aborted: {e}");
            }
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    session: Option<UserSession>,
    jobs: Vec<Job>,
    resume: Resume,
}

struct StoreInner {
    persistence: Arc<dyn Persistence>,
    seed: SeedPolicy,
    state: RwLock<StoreState>,
    /// Ticket of the most recently started load.
    load_generation: AtomicU64,
}

#[derive(Clone)]
pub struct JobStore {
    inner: Arc<StoreInner>,
}

impl JobStore {
    pub fn new(persistence: Arc<dyn Persistence>, seed: SeedPolicy) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                persistence,
                seed,
                state: RwLock::new(StoreState::default()),
                load_generation: AtomicU64::new(0),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> Option<UserSession> {
        self.read().session.clone()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.read().jobs.clone()
    }

    pub fn job(&self, id: &str) -> Option<Job> {
        self.read().jobs.iter().find(|j| j.id == id).cloned()
    }

    pub fn resume(&self) -> Resume {
        self.read().resume.clone()
    }

    /// Offer view holds offers plus applications that reached `Offer`;
    /// application view holds the remaining applications.
    pub fn jobs_by_origin(&self, origin: JobOrigin) -> Vec<Job> {
        self.read()
            .jobs
            .iter()
            .filter(|j| j.matches_origin(origin))
            .cloned()
            .collect()
    }

    /// Hydrates the store for `session`. Only the most recently started load
    /// applies its results; earlier loads that finish late are discarded.
    pub async fn load(&self, session: UserSession) -> Result<(), PersistenceError> {
        let ticket = self.inner.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.write();
            if state.session.as_ref() != Some(&session) {
                *state = StoreState {
                    session: Some(session.clone()),
                    ..StoreState::default()
                };
            }
        }

        let persistence = &self.inner.persistence;
        let fetched = tokio::try_join!(
            persistence.fetch_jobs(&session.user_id),
            persistence.fetch_resume(&session.user_id),
        );
        let (mut jobs, stored_resume) = match fetched {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to load data for user {}: {e}", session.user_id);
                return Err(e);
            }
        };

        if self.inner.load_generation.load(Ordering::SeqCst) != ticket {
            debug!(
                "Discarding stale load #{ticket} for user {}",
                session.user_id
            );
            return Ok(());
        }

        let seed_resume = stored_resume.is_none();
        let mut seeded_jobs = Vec::new();
        let resume = match stored_resume {
            Some(resume) => resume,
            None if self.inner.seed == SeedPolicy::Demo && jobs.is_empty() => {
                seeded_jobs = demo_jobs();
                jobs = seeded_jobs.clone();
                Resume::demo_for(&session)
            }
            None => Resume::seeded_for(&session),
        };
        let resume_snapshot = resume.clone();

        {
            let mut state = self.write();
            if self.inner.load_generation.load(Ordering::SeqCst) != ticket {
                return Ok(());
            }
            state.session = Some(session.clone());
            state.jobs = jobs;
            state.resume = resume;
        }
        info!(
            "Loaded workspace for user {} from {} backend",
            session.user_id,
            persistence.backend_name()
        );

        let mut seeding = Vec::new();
        if seed_resume {
            seeding.push(self.spawn_write("seed resume", move |p, user_id| async move {
                p.upsert_resume(&user_id, &resume_snapshot).await
            }));
        }
        for job in seeded_jobs.into_iter().rev() {
            seeding.push(self.spawn_write("seed job", move |p, user_id| async move {
                p.insert_job(&user_id, &job).await.map(|_| ())
            }));
        }
        for pending in seeding {
            pending.settled().await;
        }
        Ok(())
    }

    /// Adds a job to the front of the collection. An empty id gets a fresh
    /// UUID. A canonical record returned by the backend replaces the entry.
    pub fn add_job(&self, mut job: Job) -> Result<PendingWrite, StoreError> {
        job.validate().map_err(StoreError::Validation)?;
        if job.id.trim().is_empty() {
            job.id = Uuid::new_v4().to_string();
        }
        {
            let mut state = self.write();
            if state.jobs.iter().any(|j| j.id == job.id) {
                return Err(StoreError::DuplicateId(job.id));
            }
            state.jobs.insert(0, job.clone());
        }

        let store = self.clone();
        Ok(self.spawn_write("insert job", move |p, user_id| async move {
            let client_id = job.id.clone();
            if let Some(canonical) = p.insert_job(&user_id, &job).await? {
                store.reconcile(&client_id, canonical);
            }
            Ok::<(), PersistenceError>(())
        }))
    }

    fn reconcile(&self, client_id: &str, canonical: Job) {
        let mut state = self.write();
        match state.jobs.iter_mut().find(|j| j.id == client_id) {
            Some(entry) => {
                if entry.id != canonical.id {
                    debug!("Job {client_id} reassigned canonical id {}", canonical.id);
                }
                *entry = canonical;
            }
            None => debug!("Job {client_id} was removed before its insert settled"),
        }
    }

    /// Merges `patch` into the matching entry and persists only its fields.
    /// Unknown ids and empty patches change nothing.
    pub fn update_job(&self, id: &str, patch: JobPatch) -> Result<PendingWrite, StoreError> {
        patch.validate().map_err(StoreError::Validation)?;
        if patch.is_empty() {
            return Ok(PendingWrite::none());
        }
        {
            let mut state = self.write();
            let Some(job) = state.jobs.iter_mut().find(|j| j.id == id) else {
                debug!("update_job: no job with id {id}");
                return Ok(PendingWrite::none());
            };
            patch.apply_to(job);
        }

        let id = id.to_string();
        Ok(self.spawn_write("update job", move |p, user_id| async move {
            p.update_job(&user_id, &id, &patch).await
        }))
    }

    pub fn delete_job(&self, id: &str) -> PendingWrite {
        self.write().jobs.retain(|j| j.id != id);

        let id = id.to_string();
        self.spawn_write("delete job", move |p, user_id| async move {
            p.delete_job(&user_id, &id).await
        })
    }

    pub fn update_resume(&self, resume: Resume) -> PendingWrite {
        self.write().resume = resume.clone();
        self.spawn_write("upsert resume", move |p, user_id| async move {
            p.upsert_resume(&user_id, &resume).await
        })
    }

    /// Merges an AI extraction into the current résumé, giving every list
    /// entry without an identifier a fresh one.
    pub fn import_resume(&self, extracted: ExtractedResume) -> PendingWrite {
        let merged = {
            let mut state = self.write();
            state.resume.merge_extracted(extracted);
            state.resume.clone()
        };
        self.spawn_write("upsert imported resume", move |p, user_id| async move {
            p.upsert_resume(&user_id, &merged).await
        })
    }

    /// Applies `edit` to the current résumé and persists the result.
    pub fn edit_resume<R>(&self, edit: impl FnOnce(&mut Resume) -> R) -> (R, PendingWrite) {
        let (result, snapshot) = {
            let mut state = self.write();
            let result = edit(&mut state.resume);
            (result, state.resume.clone())
        };
        let pending = self.spawn_write("upsert resume", move |p, user_id| async move {
            p.upsert_resume(&user_id, &snapshot).await
        });
        (result, pending)
    }

    /// Like [`edit_resume`](Self::edit_resume), but persists only when `edit`
    /// reports a change by returning `Some`.
    pub fn edit_resume_if<R>(
        &self,
        edit: impl FnOnce(&mut Resume) -> Option<R>,
    ) -> (Option<R>, PendingWrite) {
        let (result, snapshot) = {
            let mut state = self.write();
            let result = edit(&mut state.resume);
            let snapshot = result.is_some().then(|| state.resume.clone());
            (result, snapshot)
        };
        let Some(snapshot) = snapshot else {
            return (None, PendingWrite::none());
        };
        let pending = self.spawn_write("upsert resume", move |p, user_id| async move {
            p.upsert_resume(&user_id, &snapshot).await
        });
        (result, pending)
    }

    fn spawn_write<F, Fut>(&self, what: &'static str, write: F) -> PendingWrite
    where
        F: FnOnce(Arc<dyn Persistence>, String) -> Fut,
        Fut: std::future::Future<Output = Result<(), PersistenceError>> + Send + 'static,
    {
        let Some(user_id) = self.read().session.as_ref().map(|s| s.user_id.clone()) else {
            warn!("No active session; skipping durable write ({what})");
            return PendingWrite::none();
        };
        let backend = self.inner.persistence.backend_name();
        let task = write(self.inner.persistence.clone(), user_id.clone());
        PendingWrite(Some(tokio::spawn(async move {
            match task.await {
                Ok(()) => debug!("{what} persisted for user {user_id} ({backend})"),
                Err(e) => error!("Failed to {what} for user {user_id} ({backend}): {e}"),
            }
        })))
    }
}

fn demo_jobs() -> Vec<Job> {
    let today = Utc::now().date_naive();
    let days_ago = |n: i64| Some(today - chrono::Duration::days(n));
    vec![
        Job {
            id: Uuid::new_v4().to_string(),
            company: "TechCorp Inc.".to_string(),
            role: "Senior Frontend Engineer".to_string(),
            status: JobStatus::Interview,
            salary: "$140k - $160k".to_string(),
            location: "Remote".to_string(),
            date_applied: days_ago(2),
            description: "Looking for a React expert to lead our dashboard team.".to_string(),
            origin: JobOrigin::Application,
            ..Job::default()
        },
        Job {
            id: Uuid::new_v4().to_string(),
            company: "GreenEnergy Co.".to_string(),
            role: "Full Stack Developer".to_string(),
            status: JobStatus::Applied,
            salary: "$120k".to_string(),
            location: "Austin, TX".to_string(),
            date_applied: days_ago(5),
            description: "Renewable energy startup needs help scaling.".to_string(),
            origin: JobOrigin::Application,
            ..Job::default()
        },
        Job {
            id: Uuid::new_v4().to_string(),
            company: "DataFlow Systems".to_string(),
            role: "UI Designer".to_string(),
            status: JobStatus::Offer,
            salary: "$135k".to_string(),
            location: "New York, NY".to_string(),
            date_applied: days_ago(10),
            description: "Design the next generation of data tools.".to_string(),
            origin: JobOrigin::Offer,
            interview_guide: Some("## Strategy\n\nFocus on your portfolio...".to_string()),
            ..Job::default()
        },
    ]
}
