use super::{Resettable, StoreStatus, Tracked, run_tracked};
use crate::api::ApiClient;
use crate::services;
use crate::types::{AnalyticsReport, ProjectAnalytics, ProjectId, Result};
use parking_lot::RwLock;
use std::sync::Arc;

pub use crate::types::TimeRange;

#[derive(Debug, Clone, Default)]
pub struct AnalyticsState {
    pub analytics: Option<AnalyticsReport>,
    pub range: TimeRange,
    pub project: Option<ProjectAnalytics>,
    pub status: StoreStatus,
}

impl AnalyticsState {
    pub fn loading(&self) -> bool {
        self.status.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error()
    }
}

impl Tracked for AnalyticsState {
    fn status(&self) -> &StoreStatus {
        &self.status
    }
    fn status_mut(&mut self) -> &mut StoreStatus {
        &mut self.status
    }
}

/// Dashboard figures; every fetch goes to the server
#[derive(Clone)]
pub struct AnalyticsStore {
    client: ApiClient,
    state: Arc<RwLock<AnalyticsState>>,
}

impl AnalyticsStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(AnalyticsState::default())),
        }
    }

    pub fn snapshot(&self) -> AnalyticsState {
        self.state.read().clone()
    }

    pub(crate) fn resetter(&self) -> Arc<dyn Resettable> {
        self.state.clone()
    }

    pub async fn fetch_analytics(&self, range: TimeRange) -> Result<AnalyticsReport> {
        let client = self.client.clone();
        let work = async move { Ok(services::analytics::overview(&client, range).await?.into_data()) };
        run_tracked(&self.state, "fetch_analytics", work, |s, report: AnalyticsReport| {
            s.analytics = Some(report.clone());
            s.range = range;
            report
        })
        .await
    }

    pub async fn fetch_project_analytics(
        &self,
        project_id: ProjectId,
        range: TimeRange,
    ) -> Result<ProjectAnalytics> {
        let client = self.client.clone();
        let work = async move {
            Ok(services::analytics::project(&client, project_id, range)
                .await?
                .into_data())
        };
        run_tracked(&self.state, "fetch_project_analytics", work, |s, report: ProjectAnalytics| {
            s.project = Some(report.clone());
            report
        })
        .await
    }

    pub fn clear_error(&self) {
        self.state.write().status.clear_error();
    }
}
