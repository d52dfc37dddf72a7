//! API client wrapper
//!
//! Every outbound call goes through [`ApiClient::execute`], which:
//!
//! - reads the bearer token from [`SessionStorage`] at call time, so a login
//!   or logout in another part of the program is seen by the next request
//! - tags the request with an `X-Request-ID`
//! - maps transport failures to [`AppError::Network`] and non-2xx answers to
//!   [`AppError::Api`] carrying the server's own error text
//! - on 401 from any endpoint clears the stored token and fires the
//!   installed [`UnauthorizedHandler`] before failing with
//!   [`AppError::Unauthorized`]
//!
//! Successful bodies are normalized by [`unwrap_envelope`] so callers always
//! see the payload itself, whether or not the server wrapped it in
//! `{"data": ...}`.

use crate::storage::SessionStorage;
use crate::types::{AppError, Result};
use crate::utils::config::ApiConfig;
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Keys that may sit next to `data` in a wrapped response body.
const ENVELOPE_KEYS: &[&str] = &["data", "success", "message", "status", "meta"];

/// Plain-text error bodies longer than this are not shown to users.
const MAX_TEXT_ERROR_LEN: usize = 200;

/// Reaction to a 401 from any endpoint.
///
/// This is the client's rendition of a hard redirect to the login route:
/// implementations are expected to drop all in-memory session state.
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self);
}

/// Default handler: only records that the user must log in again.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoginRedirect;

impl UnauthorizedHandler for LoginRedirect {
    fn on_unauthorized(&self) {
        warn!("Session rejected by the server, redirecting to /login");
    }
}

/// Normalized response: status, headers and the decoded payload.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> T {
        self.data
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResponse<U> {
        ApiResponse {
            status: self.status,
            headers: self.headers,
            data: f(self.data),
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn SessionStorage>,
    on_unauthorized: RwLock<Arc<dyn UnauthorizedHandler>>,
}

/// Shared HTTP client. Cloning is cheap and clones share storage and the
/// unauthorized handler.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish()
    }
}

impl ApiClient {
    /// Build a client from configuration
    pub fn new(config: &ApiConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        Self::build(&config.base_url, config.timeout(), storage)
    }

    /// Build a client for `base_url` with the default timeout
    pub fn with_base_url(base_url: impl AsRef<str>, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        Self::build(base_url.as_ref(), ApiConfig::default().timeout(), storage)
    }

    fn build(base_url: &str, timeout: Duration, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("casecrafter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                storage,
                on_unauthorized: RwLock::new(Arc::new(LoginRedirect)),
            }),
        })
    }

    /// Replace the 401 reaction for this client and all of its clones
    pub fn set_unauthorized_handler(&self, handler: Arc<dyn UnauthorizedHandler>) {
        *self.inner.on_unauthorized.write() = handler;
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.inner.storage
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    // ============= Verbs =============

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        let response = self.execute(Method::GET, path, |req| req).await?;
        decode(response).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.execute(Method::GET, path, |req| req.query(query)).await?;
        decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(Method::POST, path, |req| req.json(body)).await?;
        decode(response).await
    }

    /// POST without a request body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        let response = self.execute(Method::POST, path, |req| req).await?;
        decode(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(Method::PUT, path, |req| req.json(body)).await?;
        decode(response).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        let response = self.execute(Method::DELETE, path, |req| req).await?;
        decode(response).await
    }

    /// POST a `multipart/form-data` body
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<ApiResponse<T>> {
        let response = self
            .execute(Method::POST, path, |req| req.multipart(form))
            .await?;
        decode(response).await
    }

    /// GET a binary body (exports). The payload is returned untouched.
    pub async fn get_bytes<Q>(&self, path: &str, query: &Q) -> Result<ApiResponse<Vec<u8>>>
    where
        Q: Serialize + ?Sized,
    {
        let response = self.execute(Method::GET, path, |req| req.query(query)).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let data = response.bytes().await?.to_vec();
        Ok(ApiResponse {
            status,
            headers,
            data,
        })
    }

    // ============= Pipeline =============

    async fn execute<F>(&self, method: Method, path: &str, build: F) -> Result<reqwest::Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let request_id = Uuid::new_v4().to_string();
        let mut request = self
            .inner
            .http
            .request(method.clone(), self.url(path))
            .header("X-Request-ID", &request_id);

        if let Some(token) = self.inner.storage.access_token() {
            request = request.bearer_auth(token);
        }

        debug!(request_id = %request_id, "{} {}", method, path);

        let response = build(request).send().await.map_err(|e| {
            warn!(request_id = %request_id, "{} {} failed: {}", method, path, e);
            AppError::from(e)
        })?;

        let status = response.status();
        debug!(request_id = %request_id, status = status.as_u16(), "{} {} completed", method, path);

        if status == StatusCode::UNAUTHORIZED {
            let message = error_text(response)
                .await
                .unwrap_or_else(|| "Not authenticated".to_string());
            self.handle_unauthorized();
            return Err(AppError::Unauthorized(message));
        }

        if !status.is_success() {
            let message = error_text(response)
                .await
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            return Err(AppError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    fn handle_unauthorized(&self) {
        if let Err(e) = self.inner.storage.clear_access_token() {
            warn!("Failed to clear rejected token: {}", e);
        }
        let handler = self.inner.on_unauthorized.read().clone();
        handler.on_unauthorized();
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<ApiResponse<T>> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;

    let value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };

    let data = serde_json::from_value(unwrap_envelope(value))?;
    Ok(ApiResponse {
        status,
        headers,
        data,
    })
}

async fn error_text(response: reqwest::Response) -> Option<String> {
    let body = response.bytes().await.ok()?;
    extract_error_message(&body)
}

/// Strip a `{"data": ...}` wrapper. A body counts as wrapped only when every
/// other key is envelope metadata, so payloads that merely contain a `data`
/// field are left alone.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.contains_key("data")
                && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str())) =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Pull a display message out of an error body.
///
/// Looks at `detail` (a string, or a list of `{"msg": ...}` validation
/// entries), then `message`, then `error`. Short non-JSON bodies are used
/// as-is.
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        let text = String::from_utf8_lossy(body).trim().to_string();
        return (!text.is_empty() && text.len() <= MAX_TEXT_ERROR_LEN).then_some(text);
    };

    match value.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => return Some(detail.clone()),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_envelope_strips_data_wrapper() {
        let wrapped = json!({ "data": [1, 2, 3], "success": true });
        assert_eq!(unwrap_envelope(wrapped), json!([1, 2, 3]));
    }

    #[test]
    fn test_unwrap_envelope_keeps_payloads_with_data_field() {
        let payload = json!({ "id": 4, "data": { "x": 1 } });
        assert_eq!(unwrap_envelope(payload.clone()), payload);

        let bare = json!([{ "id": 1 }]);
        assert_eq!(unwrap_envelope(bare.clone()), bare);
    }

    #[test]
    fn test_error_message_prefers_detail() {
        let body = br#"{"detail": "Incorrect email or password", "message": "other"}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Incorrect email or password")
        );
    }

    #[test]
    fn test_error_message_joins_validation_list() {
        let body = br#"{"detail": [
            {"loc": ["body", "email"], "msg": "value is not a valid email address"},
            {"loc": ["body", "password"], "msg": "field required"}
        ]}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("value is not a valid email address; field required")
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            extract_error_message(br#"{"error": "quota exceeded"}"#).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            extract_error_message(b"Bad Gateway").as_deref(),
            Some("Bad Gateway")
        );
        assert_eq!(extract_error_message(b""), None);
        assert_eq!(extract_error_message(br#"{"status": 500}"#), None);

        let page = "<html>".repeat(100);
        assert_eq!(extract_error_message(page.as_bytes()), None);
    }
}
