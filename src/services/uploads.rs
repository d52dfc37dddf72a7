use crate::api::{ApiClient, ApiResponse};
use crate::types::{ProjectId, Result, UploadReceipt};
use crate::upload::UploadFile;
use reqwest::multipart::Form;
use serde_json::Value;

/// Create a project and upload its first document in one call
pub async fn quick(
    client: &ApiClient,
    file: &UploadFile,
    project_name: &str,
    description: Option<&str>,
) -> Result<ApiResponse<UploadReceipt>> {
    let mut form = Form::new()
        .part("file", file.to_part()?)
        .text("project_name", project_name.to_string());
    if let Some(description) = description {
        form = form.text("description", description.to_string());
    }
    client.post_multipart("/upload/quick", form).await
}

pub async fn bulk(
    client: &ApiClient,
    files: &[UploadFile],
    project_id: ProjectId,
) -> Result<ApiResponse<Value>> {
    let mut form = Form::new().text("project_id", project_id.to_string());
    for file in files {
        form = form.part("files", file.to_part()?);
    }
    client.post_multipart("/upload/bulk", form).await
}

pub async fn recent(client: &ApiClient, limit: u32) -> Result<ApiResponse<Value>> {
    client
        .get_with_query("/upload/recent", &[("limit", limit)])
        .await
}
