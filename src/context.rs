//! Application container
//!
//! [`AppContext`] is built once per application instance and owns the
//! transport, durable storage and the four stores. It installs the 401
//! reaction: every store is put back to its initial state, the persisted
//! session snapshot is dropped, and [`AppContext::login_required`] turns on
//! until the next successful sign-in.

use crate::api::{ApiClient, UnauthorizedHandler};
use crate::polling::{PollOptions, StatusPoller};
use crate::storage::{FileStorage, SESSION_SNAPSHOT_KEY, SessionStorage};
use crate::stores::{AnalyticsStore, AuthStore, ProjectStore, Resettable, TemplateStore};
use crate::types::{ProjectId, Result, TemplateApplication, TemplateId};
use crate::utils::config::ClientConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Resets all stores when the server rejects the session
struct SessionReset {
    stores: Vec<Arc<dyn Resettable>>,
    storage: Arc<dyn SessionStorage>,
    login_required: Arc<AtomicBool>,
}

impl UnauthorizedHandler for SessionReset {
    fn on_unauthorized(&self) {
        for store in &self.stores {
            store.reset();
        }
        if let Err(e) = self.storage.remove(SESSION_SNAPSHOT_KEY) {
            warn!("Failed to drop session snapshot: {}", e);
        }
        self.login_required.store(true, Ordering::SeqCst);
        info!("Session ended by the server, login required");
    }
}

#[derive(Clone)]
pub struct AppContext {
    config: Arc<ClientConfig>,
    client: ApiClient,
    pub auth: AuthStore,
    pub projects: ProjectStore,
    pub templates: TemplateStore,
    pub analytics: AnalyticsStore,
    login_required: Arc<AtomicBool>,
}

impl AppContext {
    /// Build with file-backed session storage at the configured path
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let storage = FileStorage::open(config.storage.resolved_path())?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Build over any storage backend
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let client = ApiClient::new(&config.api, Arc::clone(&storage))?;

        let auth = AuthStore::new(client.clone());
        let projects = ProjectStore::new(
            client.clone(),
            config.cache.ttl(),
            config.uploads.clone(),
        );
        let templates = TemplateStore::new(client.clone());
        let analytics = AnalyticsStore::new(client.clone());

        let login_required = Arc::new(AtomicBool::new(false));
        client.set_unauthorized_handler(Arc::new(SessionReset {
            stores: vec![
                auth.resetter(),
                projects.resetter(),
                templates.resetter(),
                analytics.resetter(),
            ],
            storage,
            login_required: Arc::clone(&login_required),
        }));

        Ok(Self {
            config: Arc::new(config),
            client,
            auth,
            projects,
            templates,
            analytics,
            login_required,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Poller using the configured interval and attempt limit
    pub fn poller(&self) -> StatusPoller {
        StatusPoller::new(self.client.clone(), PollOptions::from(&self.config.polling))
    }

    /// True after a 401 until [`AppContext::acknowledge_login`]
    pub fn login_required(&self) -> bool {
        self.login_required.load(Ordering::SeqCst)
    }

    pub fn acknowledge_login(&self) {
        self.login_required.store(false, Ordering::SeqCst);
    }

    /// Apply a template and drop the target project's cached suites and
    /// traceability matrix, which now miss the created test cases
    pub async fn apply_template(
        &self,
        template_id: TemplateId,
        project_id: ProjectId,
    ) -> Result<TemplateApplication> {
        let applied = self.templates.apply_template(template_id, project_id).await?;
        self.projects.invalidate_project_tests(project_id);
        Ok(applied)
    }

    /// Restore the persisted session, then revalidate it with the server
    pub async fn bootstrap(&self) -> Result<bool> {
        self.auth.restore_session();
        let valid = self.auth.check_auth().await?;
        if valid {
            self.acknowledge_login();
        }
        Ok(valid)
    }
}
