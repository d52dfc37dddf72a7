use crate::api::{ApiClient, ApiResponse};
use crate::types::{
    MessageResponse, ProjectId, Result, Template, TemplateApplication, TemplateDraft, TemplateId,
    TemplateUpdate,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ApplyRequest {
    project_id: ProjectId,
}

/// List templates, optionally narrowed to one category
pub async fn list(client: &ApiClient, category: Option<&str>) -> Result<ApiResponse<Vec<Template>>> {
    match category {
        Some(category) => {
            client
                .get_with_query("/templates", &[("category", category)])
                .await
        }
        None => client.get("/templates").await,
    }
}

pub async fn create(client: &ApiClient, draft: &TemplateDraft) -> Result<ApiResponse<Template>> {
    client.post("/templates", draft).await
}

pub async fn get(client: &ApiClient, id: TemplateId) -> Result<ApiResponse<Template>> {
    client.get(&format!("/templates/{}", id)).await
}

pub async fn update(
    client: &ApiClient,
    id: TemplateId,
    update: &TemplateUpdate,
) -> Result<ApiResponse<Template>> {
    client.put(&format!("/templates/{}", id), update).await
}

pub async fn delete(client: &ApiClient, id: TemplateId) -> Result<ApiResponse<MessageResponse>> {
    client.delete(&format!("/templates/{}", id)).await
}

pub async fn apply(
    client: &ApiClient,
    id: TemplateId,
    project_id: ProjectId,
) -> Result<ApiResponse<TemplateApplication>> {
    client
        .post(&format!("/templates/{}/apply", id), &ApplyRequest { project_id })
        .await
}

pub async fn categories(client: &ApiClient) -> Result<ApiResponse<Vec<String>>> {
    client.get("/templates/categories").await
}

pub async fn search(
    client: &ApiClient,
    query: &str,
    category: Option<&str>,
) -> Result<ApiResponse<Vec<Template>>> {
    let mut params = vec![("q", query)];
    if let Some(category) = category {
        params.push(("category", category));
    }
    client.get_with_query("/templates/search", &params).await
}
