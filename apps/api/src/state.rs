use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::auth::AuthProvider;
use crate::config::Config;
use crate::errors::AppError;
use crate::generation::coach::Coach;
use crate::llm_client::LlmClient;
use crate::models::UserSession;
use crate::persistence::Persistence;
use crate::store::JobStore;

/// One signed-in user's store and coach chat. Each is guarded on its own.
pub struct Workspace {
    pub store: JobStore,
    pub coach: tokio::sync::Mutex<Coach>,
    loaded: OnceCell<()>,
}

impl Workspace {
    fn new(store: JobStore) -> Self {
        Self {
            store,
            coach: tokio::sync::Mutex::new(Coach::default()),
            loaded: OnceCell::new(),
        }
    }
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub llm: LlmClient,
    pub auth: Arc<dyn AuthProvider>,
    pub persistence: Arc<dyn Persistence>,
    workspaces: Arc<Mutex<HashMap<String, Arc<Workspace>>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        llm: LlmClient,
        auth: Arc<dyn AuthProvider>,
        persistence: Arc<dyn Persistence>,
    ) -> Self {
        Self {
            config,
            llm,
            auth,
            persistence,
            workspaces: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the user's workspace, loading it from persistence on first
    /// use. A failed load is retried by the next request.
    pub async fn workspace(&self, session: &UserSession) -> Result<Arc<Workspace>, AppError> {
        let workspace = self
            .workspaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(session.user_id.clone())
            .or_insert_with(|| {
                Arc::new(Workspace::new(JobStore::new(
                    self.persistence.clone(),
                    self.config.seed_policy,
                )))
            })
            .clone();

        workspace
            .loaded
            .get_or_try_init(|| workspace.store.load(session.clone()))
            .await?;
        Ok(workspace)
    }

    pub fn close_workspace(&self, user_id: &str) {
        self.workspaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id);
    }
}
