use crate::api::{ApiClient, ApiResponse};
use crate::types::{MessageResponse, PasswordChange, Preferences, ProfileUpdate, Result, User};
use serde_json::Value;

pub async fn update_profile(client: &ApiClient, update: &ProfileUpdate) -> Result<ApiResponse<User>> {
    client.put("/settings/profile", update).await
}

pub async fn change_password(
    client: &ApiClient,
    change: &PasswordChange,
) -> Result<ApiResponse<MessageResponse>> {
    client.put("/settings/password", change).await
}

pub async fn preferences(client: &ApiClient) -> Result<ApiResponse<Preferences>> {
    client.get("/settings/preferences").await
}

pub async fn update_preferences(
    client: &ApiClient,
    preferences: &Preferences,
) -> Result<ApiResponse<Preferences>> {
    client.put("/settings/preferences", preferences).await
}

pub async fn usage(client: &ApiClient) -> Result<ApiResponse<Value>> {
    client.get("/settings/usage").await
}
