//! Shared fixtures for integration tests.
//!
//! Every test gets its own wiremock server and in-memory storage, so no
//! test touches the network or the user's session file.

#![allow(dead_code)]

use casecrafter::storage::ACCESS_TOKEN_KEY;
use casecrafter::utils::config::ClientConfig;
use casecrafter::{AppContext, MemoryStorage, SessionStorage};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

pub const TEST_TOKEN: &str = "test-token-123";

/// REST root of the mock server, matching the `/api` prefix of the backend
pub fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

/// Configuration pointing at the mock server with a fast poll cadence
pub fn test_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = api_url(server);
    config.api.timeout_secs = 5;
    config.polling.interval_ms = 10;
    config.polling.max_attempts = Some(5);
    config
}

/// Context over fresh in-memory storage
pub fn context(server: &MockServer) -> (AppContext, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let ctx = AppContext::with_storage(test_config(server), storage.clone())
        .expect("context should build");
    (ctx, storage)
}

/// Context whose storage already holds a bearer token
pub fn signed_in_context(server: &MockServer) -> (AppContext, Arc<MemoryStorage>) {
    let (ctx, storage) = context(server);
    storage.set(ACCESS_TOKEN_KEY, TEST_TOKEN).unwrap();
    (ctx, storage)
}

// ============= Payload builders =============

pub fn user_json(id: i64, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "name": "QA Lead",
        "is_verified": true,
        "created_at": "2024-03-01T10:15:30.123456"
    })
}

pub fn project_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "user_id": 1,
        "created_at": "2024-03-01T10:15:30",
        "updated_at": "2024-03-01T10:15:30"
    })
}

pub fn document_json(id: i64, project_id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "filename": format!("brd-{}.pdf", id),
        "project_id": project_id,
        "status": status,
        "uploaded_at": "2024-03-01T10:15:30",
        "file_size": 2048,
        "file_type": "application/pdf"
    })
}

pub fn suite_json(id: i64, case_ids: &[i64]) -> Value {
    let cases: Vec<Value> = case_ids
        .iter()
        .map(|case_id| {
            json!({
                "id": case_id,
                "name": format!("case {}", case_id),
                "test_type": "positive",
                "priority": "high",
                "test_steps": ["open login page", "submit valid credentials"],
                "expected_results": "user lands on dashboard",
                "requirement_id": 1
            })
        })
        .collect();
    json!({
        "id": id,
        "name": format!("Suite {}", id),
        "document_name": "brd.pdf",
        "created_at": "2024-03-01T10:15:30",
        "test_cases": cases
    })
}

pub fn matrix_json() -> Value {
    json!({
        "requirements": [
            { "id": 1, "text": "User can log in", "test_cases": [10] },
            { "id": 2, "text": "User can reset password", "test_cases": [] }
        ],
        "test_cases": [
            { "id": 10, "name": "valid login", "type": "positive" }
        ]
    })
}

pub fn status_json(status: &str, progress: u8) -> Value {
    json!({ "status": status, "progress": progress, "message": format!("{} {}%", status, progress) })
}

pub fn template_json(id: i64, name: &str, category: &str, usage_count: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "category": category,
        "test_cases_count": 3,
        "usage_count": usage_count,
        "is_public": true,
        "content": { "test_cases": [] },
        "created_at": "2024-03-01T10:15:30"
    })
}
