use crate::api::{ApiClient, ApiResponse};
use crate::types::{
    Collaborator, MessageResponse, Project, ProjectDraft, ProjectId, ProjectTemplate,
    ProjectUpdate, QuickCreateRequest, Result, ShareRequest, UserId,
};

pub async fn list(client: &ApiClient) -> Result<ApiResponse<Vec<Project>>> {
    client.get("/projects").await
}

pub async fn create(client: &ApiClient, draft: &ProjectDraft) -> Result<ApiResponse<Project>> {
    client.post("/projects", draft).await
}

pub async fn get(client: &ApiClient, id: ProjectId) -> Result<ApiResponse<Project>> {
    client.get(&format!("/projects/{}", id)).await
}

pub async fn update(
    client: &ApiClient,
    id: ProjectId,
    update: &ProjectUpdate,
) -> Result<ApiResponse<Project>> {
    client.put(&format!("/projects/{}", id), update).await
}

pub async fn delete(client: &ApiClient, id: ProjectId) -> Result<ApiResponse<MessageResponse>> {
    client.delete(&format!("/projects/{}", id)).await
}

pub async fn quick_create(
    client: &ApiClient,
    request: &QuickCreateRequest,
) -> Result<ApiResponse<Project>> {
    client.post("/projects/quick-create", request).await
}

/// Starter layouts for quick-create
pub async fn templates(client: &ApiClient) -> Result<ApiResponse<Vec<ProjectTemplate>>> {
    client.get("/projects/templates").await
}

pub async fn archive(client: &ApiClient, id: ProjectId) -> Result<ApiResponse<Project>> {
    client.post_empty(&format!("/projects/{}/archive", id)).await
}

pub async fn restore(client: &ApiClient, id: ProjectId) -> Result<ApiResponse<Project>> {
    client.post_empty(&format!("/projects/{}/restore", id)).await
}

pub async fn share(
    client: &ApiClient,
    id: ProjectId,
    request: &ShareRequest,
) -> Result<ApiResponse<MessageResponse>> {
    client.post(&format!("/projects/{}/share", id), request).await
}

pub async fn collaborators(client: &ApiClient, id: ProjectId) -> Result<ApiResponse<Vec<Collaborator>>> {
    client.get(&format!("/projects/{}/collaborators", id)).await
}

pub async fn remove_collaborator(
    client: &ApiClient,
    id: ProjectId,
    user_id: UserId,
) -> Result<ApiResponse<MessageResponse>> {
    client
        .delete(&format!("/projects/{}/collaborators/{}", id, user_id))
        .await
}
