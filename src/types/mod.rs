use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server-assigned identifiers. The client never mints these.
pub type UserId = i64;
pub type ProjectId = i64;
pub type DocumentId = i64;
pub type TestSuiteId = i64;
pub type TestCaseId = i64;
pub type RequirementId = i64;
pub type TemplateId = i64;

// ============= Session Types =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Token payload returned by login, register and refresh.
///
/// Older backends answer with only `access_token`/`token_type`; the
/// `user` and `refresh_token` fields are filled when the server sends them.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<User>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Generic `{"message": "..."}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Persisted `{user, isAuthenticated}` snapshot used to restore the
/// authenticated state across restarts without re-sending credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

// ============= Project Types =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "flexible_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub document_count: u64,
    #[serde(default)]
    pub test_suite_count: u64,
    #[serde(default)]
    pub is_archived: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Starter layout offered by `GET /projects/templates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareRequest {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "viewer".to_string()
}

// ============= Document Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    #[serde(alias = "completed")]
    Processed,
    #[serde(alias = "error")]
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    pub project_id: ProjectId,
    pub status: DocumentStatus,
    #[serde(default, with = "flexible_timestamp")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Document processing state as observed through the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    /// Nothing observed yet.
    #[default]
    Idle,
    Uploaded,
    Processing,
    #[serde(alias = "processed")]
    Completed,
    #[serde(alias = "error")]
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProcessingState {
    /// Only `processing` keeps a run going; any other observed state ends it.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessingState::Processing)
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProcessingState::Idle => "idle",
            ProcessingState::Uploaded => "uploaded",
            ProcessingState::Processing => "processing",
            ProcessingState::Completed => "completed",
            ProcessingState::Failed => "failed",
            ProcessingState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingStatus {
    pub status: ProcessingState,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RequirementId,
    #[serde(alias = "text")]
    pub original_text: String,
    #[serde(default, alias = "type")]
    pub requirement_type: Option<String>,
    #[serde(default)]
    pub complexity_score: Option<f64>,
}

// ============= Test Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Positive,
    Negative,
    Edge,
    Security,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Absent on freshly generated cases embedded in templates.
    #[serde(default)]
    pub id: Option<TestCaseId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_type: TestType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub test_steps: Vec<String>,
    #[serde(default)]
    pub expected_results: Option<String>,
    #[serde(default)]
    pub test_data: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub requirement_id: Option<RequirementId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: TestSuiteId,
    pub name: String,
    #[serde(default)]
    pub document_name: Option<String>,
    #[serde(default, with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Partial update for `PUT /test-cases/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestCaseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<TestType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_steps: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_results: Option<String>,
}

/// Result of `POST /documents/{id}/generate-tests`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResult {
    pub test_suite: TestSuite,
    #[serde(default)]
    pub traceability_matrix: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedRequirement {
    pub id: RequirementId,
    #[serde(alias = "text")]
    pub original_text: String,
    /// Ids of the test cases covering this requirement.
    #[serde(default)]
    pub test_cases: Vec<TestCaseId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseRef {
    pub id: TestCaseId,
    pub name: String,
    #[serde(default, rename = "type", alias = "test_type")]
    pub test_type: Option<TestType>,
}

/// Requirement to test-case mapping. Coverage is derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceabilityMatrix {
    #[serde(default)]
    pub requirements: Vec<TracedRequirement>,
    #[serde(default)]
    pub test_cases: Vec<TestCaseRef>,
}

impl TraceabilityMatrix {
    /// Percentage of requirements linked to at least one test case.
    pub fn coverage(&self) -> f64 {
        if self.requirements.is_empty() {
            return 0.0;
        }
        let covered = self
            .requirements
            .iter()
            .filter(|r| !r.test_cases.is_empty())
            .count();
        (covered as f64 / self.requirements.len() as f64) * 100.0
    }

    /// Requirements without any linked test case.
    pub fn uncovered(&self) -> Vec<&TracedRequirement> {
        self.requirements
            .iter()
            .filter(|r| r.test_cases.is_empty())
            .collect()
    }

    /// Resolve the test cases linked to a requirement.
    pub fn tests_for(&self, requirement_id: RequirementId) -> Vec<&TestCaseRef> {
        let Some(requirement) = self.requirements.iter().find(|r| r.id == requirement_id) else {
            return Vec::new();
        };
        self.test_cases
            .iter()
            .filter(|tc| requirement.test_cases.contains(&tc.id))
            .collect()
    }
}

// ============= Template Types =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub test_cases_count: u64,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default, with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    "functional".to_string()
}

impl Template {
    /// Test case definitions embedded in `content.test_cases`.
    /// Entries that do not describe a test case are skipped.
    pub fn test_case_definitions(&self) -> Vec<TestCase> {
        self.content
            .get("test_cases")
            .and_then(|v| v.as_array())
            .map(|cases| {
                cases
                    .iter()
                    .filter_map(|c| serde_json::from_value(c.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub content: serde_json::Value,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateApplication {
    pub id: i64,
    pub template_id: TemplateId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub test_cases_created: u64,
    #[serde(default, with = "flexible_timestamp")]
    pub applied_at: Option<DateTime<Utc>>,
}

// ============= Analytics Types =============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityRecord {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsReport {
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub documents_analyzed: u64,
    #[serde(default)]
    pub test_cases_generated: u64,
    #[serde(default)]
    pub avg_processing_time: f64,
    #[serde(default)]
    pub recent_activity: Vec<ActivityRecord>,
    #[serde(default)]
    pub projects_overview: serde_json::Value,
    #[serde(default)]
    pub test_cases_by_type: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectAnalytics {
    pub project_id: ProjectId,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub documents_count: u64,
    #[serde(default)]
    pub test_suites_count: u64,
    #[serde(default)]
    pub test_cases_count: u64,
    #[serde(default)]
    pub recent_activity: Vec<ActivityRecord>,
}

/// Reporting window accepted by the analytics endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
            TimeRange::Year => "1y",
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            "90d" => Ok(TimeRange::Quarter),
            "1y" => Ok(TimeRange::Year),
            other => Err(AppError::InvalidInput(format!(
                "Unknown time range '{}'. Use 7d, 30d, 90d or 1y.",
                other
            ))),
        }
    }
}

// ============= Upload & Settings Types =============

#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub upload_id: String,
    pub status: String,
    pub project_id: ProjectId,
    pub document_id: DocumentId,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_export_format")]
    pub default_export_format: String,
    #[serde(default = "default_true")]
    pub auto_process_documents: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_export_format() -> String {
    "excel".to_string()
}

fn default_true() -> bool {
    true
}

fn default_theme() -> String {
    "dark".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_export_format: default_export_format(),
            auto_process_documents: true,
            theme: default_theme(),
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// The server finished a document run in the failed state
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Display string kept in a store's `error` field. Server-provided
    /// text is used verbatim when there is one.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::InvalidInput(msg)
            | AppError::ProcessingFailed(msg) => msg.clone(),
            AppError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Unauthorized(_) => Some(401),
            AppError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server rejected the request rather than the
    /// transport failing.
    pub fn is_rejection(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else if err.is_timeout() {
            AppError::Network(format!("request timed out: {}", err))
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Accepts RFC 3339 timestamps as well as the naive ISO-8601 strings
/// (`2024-01-01T10:00:00.123456`) produced by the backend, read as UTC.
pub(crate) mod flexible_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Some(naive.and_utc()))
            .map_err(serde::de::Error::custom)
    }
}
