use crate::api::{ApiClient, ApiResponse};
use crate::types::{
    Document, DocumentId, MessageResponse, ProcessingStatus, ProjectId, Requirement, Result,
};
use crate::upload::UploadFile;
use reqwest::multipart::Form;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RequirementsBody {
    #[serde(default)]
    requirements: Vec<Requirement>,
}

/// Upload a BRD into a project as multipart field `file`
pub async fn upload(
    client: &ApiClient,
    project_id: ProjectId,
    file: &UploadFile,
) -> Result<ApiResponse<Document>> {
    let form = Form::new().part("file", file.to_part()?);
    client
        .post_multipart(&format!("/projects/{}/documents", project_id), form)
        .await
}

pub async fn list(client: &ApiClient, project_id: ProjectId) -> Result<ApiResponse<Vec<Document>>> {
    client
        .get(&format!("/projects/{}/documents", project_id))
        .await
}

pub async fn get(client: &ApiClient, id: DocumentId) -> Result<ApiResponse<Document>> {
    client.get(&format!("/documents/{}", id)).await
}

pub async fn status(client: &ApiClient, id: DocumentId) -> Result<ApiResponse<ProcessingStatus>> {
    client.get(&format!("/documents/{}/status", id)).await
}

/// Requirements extracted from a processed document
pub async fn requirements(
    client: &ApiClient,
    id: DocumentId,
) -> Result<ApiResponse<Vec<Requirement>>> {
    let response: ApiResponse<RequirementsBody> = client
        .get(&format!("/documents/{}/requirements", id))
        .await?;
    Ok(response.map(|body| body.requirements))
}

pub async fn delete(client: &ApiClient, id: DocumentId) -> Result<ApiResponse<MessageResponse>> {
    client.delete(&format!("/documents/{}", id)).await
}
