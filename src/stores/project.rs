//! Project workspace store
//!
//! Holds the project list, the current project and the collections shown
//! for it. Documents, test suites and the traceability matrix go through a
//! [`ProjectCache`]: a read within the TTL is answered from memory unless the
//! caller forces a refresh, and every mutating action drops only the entries
//! it could have made stale.

use super::{Resettable, StoreStatus, Tracked, reject_locally, run_tracked};
use crate::api::ApiClient;
use crate::cache::{CacheKey, CacheStats, CachedValue, ProjectCache, ResourceKind};
use crate::export::{self, ExportFormat, ExportedFile};
use crate::services;
use crate::types::{
    AppError, Document, DocumentId, GenerationResult, Project, ProjectDraft, ProjectId,
    ProjectUpdate, QuickCreateRequest, Requirement, Result, TestCase, TestCaseId, TestCaseUpdate,
    TestSuite, TestSuiteId, TraceabilityMatrix,
};
use crate::upload::UploadFile;
use crate::utils::config::UploadConfig;
use parking_lot::RwLock;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ProjectState {
    pub projects: Vec<Project>,
    pub current_project: Option<Project>,
    pub documents: Arc<Vec<Document>>,
    /// Project the `documents` list belongs to
    pub documents_project: Option<ProjectId>,
    pub requirements: Vec<Requirement>,
    pub test_suites: Arc<Vec<TestSuite>>,
    pub traceability_matrix: Option<Arc<TraceabilityMatrix>>,
    pub status: StoreStatus,
}

impl ProjectState {
    pub fn loading(&self) -> bool {
        self.status.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error()
    }

    fn project_of_document(&self, document_id: DocumentId) -> Option<ProjectId> {
        self.documents
            .iter()
            .find(|d| d.id == document_id)
            .map(|d| d.project_id)
    }

    fn replace_project(&mut self, project: &Project) {
        if let Some(slot) = self.projects.iter_mut().find(|p| p.id == project.id) {
            *slot = project.clone();
        }
        if self.current_project.as_ref().is_some_and(|p| p.id == project.id) {
            self.current_project = Some(project.clone());
        }
    }
}

impl Tracked for ProjectState {
    fn status(&self) -> &StoreStatus {
        &self.status
    }
    fn status_mut(&mut self) -> &mut StoreStatus {
        &mut self.status
    }
}

/// Cache presence and age of one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheEntryStatus {
    pub cached: bool,
    pub age: Option<Duration>,
}

/// Per-resource cache view for one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub documents: CacheEntryStatus,
    pub test_suites: CacheEntryStatus,
    pub traceability: CacheEntryStatus,
}

/// A collection that lives in the project cache
trait CachedResource: Sized {
    const KIND: ResourceKind;
    fn pack(value: Arc<Self>) -> CachedValue;
    fn unpack(value: CachedValue) -> Option<Arc<Self>>;
    fn install(state: &mut ProjectState, project_id: ProjectId, value: Arc<Self>);
}

impl CachedResource for Vec<Document> {
    const KIND: ResourceKind = ResourceKind::Documents;

    fn pack(value: Arc<Self>) -> CachedValue {
        CachedValue::Documents(value)
    }

    fn unpack(value: CachedValue) -> Option<Arc<Self>> {
        match value {
            CachedValue::Documents(docs) => Some(docs),
            _ => None,
        }
    }

    fn install(state: &mut ProjectState, project_id: ProjectId, value: Arc<Self>) {
        state.documents = value;
        state.documents_project = Some(project_id);
    }
}

impl CachedResource for Vec<TestSuite> {
    const KIND: ResourceKind = ResourceKind::TestSuites;

    fn pack(value: Arc<Self>) -> CachedValue {
        CachedValue::TestSuites(value)
    }

    fn unpack(value: CachedValue) -> Option<Arc<Self>> {
        match value {
            CachedValue::TestSuites(suites) => Some(suites),
            _ => None,
        }
    }

    fn install(state: &mut ProjectState, _: ProjectId, value: Arc<Self>) {
        state.test_suites = value;
    }
}

impl CachedResource for TraceabilityMatrix {
    const KIND: ResourceKind = ResourceKind::Traceability;

    fn pack(value: Arc<Self>) -> CachedValue {
        CachedValue::Traceability(value)
    }

    fn unpack(value: CachedValue) -> Option<Arc<Self>> {
        match value {
            CachedValue::Traceability(matrix) => Some(matrix),
            _ => None,
        }
    }

    fn install(state: &mut ProjectState, _: ProjectId, value: Arc<Self>) {
        state.traceability_matrix = Some(value);
    }
}

struct ProjectShared {
    state: RwLock<ProjectState>,
    cache: ProjectCache,
}

impl ProjectShared {
    /// Drop cached suites and matrices for one project, or for every project
    /// when the owner is unknown
    fn invalidate_tests(&self, owner: Option<ProjectId>) -> usize {
        let stale = [ResourceKind::TestSuites, ResourceKind::Traceability];
        match owner {
            Some(project_id) => self
                .cache
                .invalidate_where(|key| key.project_id == project_id && stale.contains(&key.kind)),
            None => self.cache.invalidate_where(|key| stale.contains(&key.kind)),
        }
    }
}

impl Resettable for ProjectShared {
    fn reset(&self) {
        self.state.reset();
        self.cache.clear();
    }
}

#[derive(Clone)]
pub struct ProjectStore {
    client: ApiClient,
    shared: Arc<ProjectShared>,
    upload_rules: Arc<UploadConfig>,
}

impl ProjectStore {
    pub fn new(client: ApiClient, cache_ttl: Duration, upload_rules: UploadConfig) -> Self {
        Self {
            client,
            shared: Arc::new(ProjectShared {
                state: RwLock::new(ProjectState::default()),
                cache: ProjectCache::new(cache_ttl),
            }),
            upload_rules: Arc::new(upload_rules),
        }
    }

    fn state(&self) -> &RwLock<ProjectState> {
        &self.shared.state
    }

    fn cache(&self) -> &ProjectCache {
        &self.shared.cache
    }

    pub(crate) fn resetter(&self) -> Arc<dyn Resettable> {
        self.shared.clone()
    }

    /// Forget a project's cached test suites and traceability matrix after
    /// test cases were created for it elsewhere
    pub fn invalidate_project_tests(&self, project_id: ProjectId) -> usize {
        let dropped = self.shared.invalidate_tests(Some(project_id));
        debug!(project_id, dropped, "invalidated suites and matrix");
        dropped
    }

    // ============= Reads =============

    pub fn snapshot(&self) -> ProjectState {
        self.state().read().clone()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state().read().projects.clone()
    }

    pub fn current_project(&self) -> Option<Project> {
        self.state().read().current_project.clone()
    }

    pub fn documents(&self) -> Arc<Vec<Document>> {
        Arc::clone(&self.state().read().documents)
    }

    pub fn test_suites(&self) -> Arc<Vec<TestSuite>> {
        Arc::clone(&self.state().read().test_suites)
    }

    pub fn traceability_matrix(&self) -> Option<Arc<TraceabilityMatrix>> {
        self.state().read().traceability_matrix.clone()
    }

    pub fn requirements(&self) -> Vec<Requirement> {
        self.state().read().requirements.clone()
    }

    pub fn clear_error(&self) {
        self.state().write().status.clear_error();
    }

    // ============= Projects =============

    pub async fn fetch_projects(&self) -> Result<Vec<Project>> {
        let client = self.client.clone();
        let work = async move { Ok(services::projects::list(&client).await?.into_data()) };
        run_tracked(self.state(), "fetch_projects", work, |s, projects: Vec<Project>| {
            s.projects = projects.clone();
            projects
        })
        .await
    }

    pub async fn fetch_project(&self, id: ProjectId) -> Result<Project> {
        let client = self.client.clone();
        let work = async move { Ok(services::projects::get(&client, id).await?.into_data()) };
        run_tracked(self.state(), "fetch_project", work, |s, project: Project| {
            s.replace_project(&project);
            s.current_project = Some(project.clone());
            project
        })
        .await
    }

    pub fn set_current_project(&self, project: Option<Project>) {
        self.state().write().current_project = project;
    }

    pub async fn create_project(&self, draft: ProjectDraft) -> Result<Project> {
        if draft.name.trim().is_empty() {
            return Err(reject_locally(self.state(), "Project name is required"));
        }
        let client = self.client.clone();
        let work = async move { Ok(services::projects::create(&client, &draft).await?.into_data()) };
        run_tracked(self.state(), "create_project", work, append_as_current).await
    }

    pub async fn quick_create_project(&self, request: QuickCreateRequest) -> Result<Project> {
        if request.name.trim().is_empty() {
            return Err(reject_locally(self.state(), "Project name is required"));
        }
        let client = self.client.clone();
        let work = async move {
            Ok(services::projects::quick_create(&client, &request)
                .await?
                .into_data())
        };
        run_tracked(self.state(), "quick_create_project", work, append_as_current).await
    }

    pub async fn update_project(&self, id: ProjectId, update: ProjectUpdate) -> Result<Project> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(reject_locally(self.state(), "Project name cannot be empty"));
        }
        let client = self.client.clone();
        let work = async move {
            Ok(services::projects::update(&client, id, &update)
                .await?
                .into_data())
        };
        run_tracked(self.state(), "update_project", work, replace_in_place).await
    }

    pub async fn delete_project(&self, id: ProjectId) -> Result<()> {
        let client = self.client.clone();
        let shared = self.shared.clone();
        let work = async move {
            services::projects::delete(&client, id).await?;
            let dropped = shared.cache.invalidate_where(|key| key.project_id == id);
            debug!(project_id = id, dropped, "invalidated cache for deleted project");
            Ok(())
        };
        run_tracked(self.state(), "delete_project", work, |s, ()| {
            s.projects.retain(|p| p.id != id);
            if s.current_project.as_ref().is_some_and(|p| p.id == id) {
                s.current_project = None;
            }
            if s.documents_project == Some(id) {
                s.documents = Arc::default();
                s.documents_project = None;
            }
        })
        .await
    }

    pub async fn archive_project(&self, id: ProjectId) -> Result<Project> {
        let client = self.client.clone();
        let work = async move { Ok(services::projects::archive(&client, id).await?.into_data()) };
        run_tracked(self.state(), "archive_project", work, replace_in_place).await
    }

    pub async fn restore_project(&self, id: ProjectId) -> Result<Project> {
        let client = self.client.clone();
        let work = async move { Ok(services::projects::restore(&client, id).await?.into_data()) };
        run_tracked(self.state(), "restore_project", work, replace_in_place).await
    }

    // ============= Documents =============

    /// Upload a document. The file is checked locally first; on success the
    /// project's cached document list is dropped.
    pub async fn upload_document(&self, project_id: ProjectId, file: UploadFile) -> Result<Document> {
        if let Err(err) = file.validate(&self.upload_rules) {
            return Err(reject_locally(self.state(), &err.user_message()));
        }

        let client = self.client.clone();
        let shared = self.shared.clone();
        let work = async move {
            let document = services::documents::upload(&client, project_id, &file)
                .await?
                .into_data();
            shared
                .cache
                .invalidate(&CacheKey::new(ResourceKind::Documents, project_id));
            info!(project_id, document_id = document.id, "Uploaded {}", document.filename);
            Ok(document)
        };
        run_tracked(self.state(), "upload_document", work, |s, document: Document| {
            if s.documents_project == Some(project_id) {
                let mut docs = (*s.documents).clone();
                docs.push(document.clone());
                s.documents = Arc::new(docs);
            }
            document
        })
        .await
    }

    pub async fn fetch_documents(&self, project_id: ProjectId, force: bool) -> Result<Arc<Vec<Document>>> {
        let client = self.client.clone();
        self.fetch_cached(project_id, force, "fetch_documents", async move {
            Ok(services::documents::list(&client, project_id)
                .await?
                .into_data())
        })
        .await
    }

    pub async fn delete_document(&self, document_id: DocumentId) -> Result<()> {
        let owner = self.state().read().project_of_document(document_id);
        let client = self.client.clone();
        let shared = self.shared.clone();
        let work = async move {
            services::documents::delete(&client, document_id).await?;
            match owner {
                Some(project_id) => {
                    shared.cache.invalidate_where(|key| key.project_id == project_id);
                }
                None => {
                    shared.cache.clear();
                }
            }
            Ok(())
        };
        run_tracked(self.state(), "delete_document", work, |s, ()| {
            if s.documents.iter().any(|d| d.id == document_id) {
                let docs = s
                    .documents
                    .iter()
                    .filter(|d| d.id != document_id)
                    .cloned()
                    .collect();
                s.documents = Arc::new(docs);
            }
        })
        .await
    }

    pub async fn fetch_requirements(&self, document_id: DocumentId) -> Result<Vec<Requirement>> {
        let client = self.client.clone();
        let work = async move {
            Ok(services::documents::requirements(&client, document_id)
                .await?
                .into_data())
        };
        run_tracked(self.state(), "fetch_requirements", work, |s, reqs: Vec<Requirement>| {
            s.requirements = reqs.clone();
            reqs
        })
        .await
    }

    // ============= Test suites =============

    /// Generate test cases for a document.
    ///
    /// Drops the cached suites and matrix of the document's project. When the
    /// document is not in the loaded list its project is unknown, and those
    /// entries are dropped for every project.
    pub async fn generate_test_cases(&self, document_id: DocumentId) -> Result<GenerationResult> {
        let owner = self.state().read().project_of_document(document_id);
        let client = self.client.clone();
        let shared = self.shared.clone();
        let work = async move {
            let result = services::tests::generate(&client, document_id)
                .await?
                .into_data();
            let dropped = shared.invalidate_tests(owner);
            debug!(document_id, dropped, "invalidated suites after generation");
            Ok(result)
        };
        run_tracked(self.state(), "generate_test_cases", work, |s, result: GenerationResult| {
            let mut suites = (*s.test_suites).clone();
            suites.push(result.test_suite.clone());
            s.test_suites = Arc::new(suites);
            result
        })
        .await
    }

    pub async fn fetch_test_suites(&self, project_id: ProjectId, force: bool) -> Result<Arc<Vec<TestSuite>>> {
        let client = self.client.clone();
        self.fetch_cached(project_id, force, "fetch_test_suites", async move {
            Ok(services::tests::suites(&client, project_id)
                .await?
                .into_data())
        })
        .await
    }

    pub async fn fetch_traceability_matrix(
        &self,
        project_id: ProjectId,
        force: bool,
    ) -> Result<Arc<TraceabilityMatrix>> {
        let client = self.client.clone();
        self.fetch_cached(project_id, force, "fetch_traceability_matrix", async move {
            Ok(services::tests::traceability_matrix(&client, project_id)
                .await?
                .into_data())
        })
        .await
    }

    /// Edit one test case. Cached suite lists cannot be mapped back to a
    /// case, so every cached suite list is dropped.
    pub async fn update_test_case(&self, case_id: TestCaseId, update: TestCaseUpdate) -> Result<TestCase> {
        let client = self.client.clone();
        let shared = self.shared.clone();
        let work = async move {
            let case = services::tests::update_case(&client, case_id, &update)
                .await?
                .into_data();
            shared
                .cache
                .invalidate_where(|key| key.kind == ResourceKind::TestSuites);
            Ok(case)
        };
        run_tracked(self.state(), "update_test_case", work, |s, case: TestCase| {
            let mut suites = (*s.test_suites).clone();
            for suite in suites.iter_mut() {
                if let Some(slot) = suite.test_cases.iter_mut().find(|c| c.id == Some(case_id)) {
                    *slot = case.clone();
                }
            }
            s.test_suites = Arc::new(suites);
            case
        })
        .await
    }

    /// Download a suite export into `dir`. The file name comes from the
    /// server's `Content-Disposition`, then `file_name`, then
    /// `test-suite-{id}.{ext}`.
    pub async fn export_test_suite(
        &self,
        suite_id: TestSuiteId,
        format: ExportFormat,
        dir: &Path,
        file_name: Option<&str>,
    ) -> Result<ExportedFile> {
        let client = self.client.clone();
        let dir = dir.to_path_buf();
        let requested = file_name.map(str::to_string);
        let work = async move {
            let response = services::tests::export(&client, suite_id, format).await?;
            let name = export::resolve_filename(
                response.header("content-disposition"),
                requested.as_deref(),
                suite_id,
                format,
            );
            export::save_export(&dir, &name, &response.data).await
        };
        run_tracked(self.state(), "export_test_suite", work, |_, file: ExportedFile| file).await
    }

    // ============= Refresh & cache =============

    /// Drop the project's cached collections, then refetch all three
    /// concurrently. Every branch runs to completion; the first error is
    /// returned.
    pub async fn refresh_project_data(&self, project_id: ProjectId) -> Result<()> {
        let dropped = self
            .cache()
            .invalidate_where(|key| key.project_id == project_id);
        debug!(project_id, dropped, "refreshing project data");

        let (documents, suites, matrix) = futures::join!(
            self.fetch_documents(project_id, true),
            self.fetch_test_suites(project_id, true),
            self.fetch_traceability_matrix(project_id, true),
        );
        documents?;
        suites?;
        matrix?;
        info!(project_id, "Project data refreshed");
        Ok(())
    }

    pub fn cache_status(&self, project_id: ProjectId) -> CacheStatus {
        let entry = |kind| {
            let age = self.cache().age(&CacheKey::new(kind, project_id));
            CacheEntryStatus {
                cached: age.is_some(),
                age,
            }
        };
        CacheStatus {
            documents: entry(ResourceKind::Documents),
            test_suites: entry(ResourceKind::TestSuites),
            traceability: entry(ResourceKind::Traceability),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
        debug!("project cache cleared");
    }

    async fn fetch_cached<R, Fut>(
        &self,
        project_id: ProjectId,
        force: bool,
        action: &'static str,
        fetch: Fut,
    ) -> Result<Arc<R>>
    where
        R: CachedResource,
        Fut: Future<Output = Result<R>>,
    {
        let key = CacheKey::new(R::KIND, project_id);
        if !force {
            if let Some((value, inserted_at)) = self.cache().get(&key) {
                let hit = R::unpack(value).ok_or_else(|| {
                    AppError::Storage(format!("cache entry {} holds the wrong resource", key))
                })?;
                debug!(%key, age_ms = inserted_at.elapsed().as_millis() as u64, "cache hit");
                R::install(&mut self.state().write(), project_id, Arc::clone(&hit));
                return Ok(hit);
            }
        }

        let shared = self.shared.clone();
        let work = async move {
            let fresh = Arc::new(fetch.await?);
            shared.cache.put(key, R::pack(Arc::clone(&fresh)));
            debug!(%key, "cache filled");
            Ok(fresh)
        };
        run_tracked(self.state(), action, work, |s, fresh: Arc<R>| {
            R::install(s, project_id, Arc::clone(&fresh));
            fresh
        })
        .await
    }
}

fn append_as_current(state: &mut ProjectState, project: Project) -> Project {
    state.projects.push(project.clone());
    state.current_project = Some(project.clone());
    project
}

fn replace_in_place(state: &mut ProjectState, project: Project) -> Project {
    state.replace_project(&project);
    project
}
