use crate::api::{ApiClient, ApiResponse};
use crate::types::{AnalyticsReport, ProjectAnalytics, ProjectId, Result, TimeRange};
use serde_json::Value;

fn period(range: TimeRange) -> [(&'static str, &'static str); 1] {
    [("period", range.as_str())]
}

pub async fn overview(client: &ApiClient, range: TimeRange) -> Result<ApiResponse<AnalyticsReport>> {
    client.get_with_query("/analytics", &period(range)).await
}

pub async fn project(
    client: &ApiClient,
    project_id: ProjectId,
    range: TimeRange,
) -> Result<ApiResponse<ProjectAnalytics>> {
    client
        .get_with_query(&format!("/analytics/projects/{}", project_id), &period(range))
        .await
}

pub async fn documents(client: &ApiClient, range: TimeRange) -> Result<ApiResponse<Value>> {
    client
        .get_with_query("/analytics/documents", &period(range))
        .await
}

pub async fn test_suites(client: &ApiClient, range: TimeRange) -> Result<ApiResponse<Value>> {
    client
        .get_with_query("/analytics/test-suites", &period(range))
        .await
}
