use crate::api::{ApiClient, ApiResponse};
use crate::export::ExportFormat;
use crate::types::{
    DocumentId, GenerationResult, ProjectId, RequirementId, Result, TestCase, TestCaseId,
    TestCaseUpdate, TestSuite, TestSuiteId, TraceabilityMatrix,
};
use serde::Deserialize;
use serde_json::Value;

/// `GET /projects/{id}/test-suite` answers `{"test_suites": [...]}`; a bare
/// list is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuitesBody {
    Wrapped { test_suites: Vec<TestSuite> },
    Bare(Vec<TestSuite>),
}

impl SuitesBody {
    fn into_suites(self) -> Vec<TestSuite> {
        match self {
            SuitesBody::Wrapped { test_suites } | SuitesBody::Bare(test_suites) => test_suites,
        }
    }
}

/// Start server-side test generation for a document
pub async fn generate(
    client: &ApiClient,
    document_id: DocumentId,
) -> Result<ApiResponse<GenerationResult>> {
    client
        .post_empty(&format!("/documents/{}/generate-tests", document_id))
        .await
}

pub async fn suites(client: &ApiClient, project_id: ProjectId) -> Result<ApiResponse<Vec<TestSuite>>> {
    let response: ApiResponse<SuitesBody> = client
        .get(&format!("/projects/{}/test-suite", project_id))
        .await?;
    Ok(response.map(SuitesBody::into_suites))
}

pub async fn traceability_matrix(
    client: &ApiClient,
    project_id: ProjectId,
) -> Result<ApiResponse<TraceabilityMatrix>> {
    client
        .get(&format!("/projects/{}/traceability-matrix", project_id))
        .await
}

/// Download a suite export; the body is the file itself
pub async fn export(
    client: &ApiClient,
    suite_id: TestSuiteId,
    format: ExportFormat,
) -> Result<ApiResponse<Vec<u8>>> {
    client
        .get_bytes(
            &format!("/test-suites/{}/export", suite_id),
            &[("format", format.as_query())],
        )
        .await
}

pub async fn update_case(
    client: &ApiClient,
    case_id: TestCaseId,
    update: &TestCaseUpdate,
) -> Result<ApiResponse<TestCase>> {
    client.put(&format!("/test-cases/{}", case_id), update).await
}

pub async fn semantic_search(
    client: &ApiClient,
    project_id: ProjectId,
    query: &str,
) -> Result<ApiResponse<Value>> {
    client
        .get_with_query(
            &format!("/projects/{}/semantic-search", project_id),
            &[("query", query)],
        )
        .await
}

pub async fn impact_analysis(
    client: &ApiClient,
    project_id: ProjectId,
    requirement_id: RequirementId,
) -> Result<ApiResponse<Value>> {
    client
        .get(&format!(
            "/projects/{}/impact-analysis/{}",
            project_id, requirement_id
        ))
        .await
}
