use crate::api::{ApiClient, ApiResponse};
use crate::types::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RefreshTokenRequest,
    RegisterRequest, ResetPasswordRequest, Result, User, VerifyEmailRequest,
};

pub async fn login(client: &ApiClient, request: &LoginRequest) -> Result<ApiResponse<AuthResponse>> {
    client.post("/auth/login", request).await
}

pub async fn register(
    client: &ApiClient,
    request: &RegisterRequest,
) -> Result<ApiResponse<AuthResponse>> {
    client.post("/auth/register", request).await
}

/// Current user for the stored token
pub async fn me(client: &ApiClient) -> Result<ApiResponse<User>> {
    client.get("/auth/me").await
}

pub async fn refresh(client: &ApiClient, refresh_token: &str) -> Result<ApiResponse<AuthResponse>> {
    let request = RefreshTokenRequest {
        refresh_token: refresh_token.to_string(),
    };
    client.post("/auth/refresh", &request).await
}

pub async fn forgot_password(client: &ApiClient, email: &str) -> Result<ApiResponse<MessageResponse>> {
    let request = ForgotPasswordRequest {
        email: email.to_string(),
    };
    client.post("/auth/forgot-password", &request).await
}

pub async fn reset_password(
    client: &ApiClient,
    token: &str,
    password: &str,
) -> Result<ApiResponse<MessageResponse>> {
    let request = ResetPasswordRequest {
        token: token.to_string(),
        password: password.to_string(),
    };
    client.post("/auth/reset-password", &request).await
}

pub async fn verify_email(client: &ApiClient, token: &str) -> Result<ApiResponse<MessageResponse>> {
    let request = VerifyEmailRequest {
        token: token.to_string(),
    };
    client.post("/auth/verify-email", &request).await
}
