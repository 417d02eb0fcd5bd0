//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::TrackerError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Database Errors (exit code 2) ===
    DatabaseNotFound,
    DatabaseError,
    QueryFailed,
    NotInitialized,
    AlreadyInitialized,

    // === Entity Errors (exit code 3) ===
    IssueNotFound,
    ViewNotFound,
    ComponentNotFound,
    TeamNotFound,
    IdentityRequired,

    // === Validation Errors (exit code 4) ===
    ValidationFailed,
    InvalidStatus,
    InvalidPriority,
    InvalidSeverity,
    InvalidId,

    // === Config Errors (exit code 7) ===
    ConfigError,

    // === I/O Errors (exit code 8) ===
    IoError,
    JsonError,
    YamlError,

    // === Internal Errors (exit code 1) ===
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseNotFound => "DATABASE_NOT_FOUND",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::QueryFailed => "QUERY_FAILED",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::ViewNotFound => "VIEW_NOT_FOUND",
            Self::ComponentNotFound => "COMPONENT_NOT_FOUND",
            Self::TeamNotFound => "TEAM_NOT_FOUND",
            Self::IdentityRequired => "IDENTITY_REQUIRED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidPriority => "INVALID_PRIORITY",
            Self::InvalidSeverity => "INVALID_SEVERITY",
            Self::InvalidId => "INVALID_ID",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Retryable means the caller might succeed if it fixes the input
    /// or waits for a busy database.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QueryFailed
                | Self::ValidationFailed
                | Self::InvalidStatus
                | Self::InvalidPriority
                | Self::InvalidSeverity
                | Self::InvalidId
                | Self::IdentityRequired
        )
    }

    /// Get the exit code for this error category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DatabaseNotFound
            | Self::DatabaseError
            | Self::QueryFailed
            | Self::NotInitialized
            | Self::AlreadyInitialized => 2,
            Self::IssueNotFound
            | Self::ViewNotFound
            | Self::ComponentNotFound
            | Self::TeamNotFound
            | Self::IdentityRequired => 3,
            Self::ValidationFailed
            | Self::InvalidStatus
            | Self::InvalidPriority
            | Self::InvalidSeverity
            | Self::InvalidId => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `TrackerError`.
    #[must_use]
    pub fn from_error(err: &TrackerError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &TrackerError) -> (ErrorCode, Option<Value>) {
        match err {
            TrackerError::DatabaseNotFound { path } => (
                ErrorCode::DatabaseNotFound,
                Some(json!({"path": path.display().to_string()})),
            ),
            TrackerError::Database(_) => (ErrorCode::DatabaseError, None),
            TrackerError::QueryExecution { .. } => (ErrorCode::QueryFailed, None),
            TrackerError::NotInitialized => (ErrorCode::NotInitialized, None),
            TrackerError::AlreadyInitialized { path } => (
                ErrorCode::AlreadyInitialized,
                Some(json!({"path": path.display().to_string()})),
            ),
            TrackerError::IssueNotFound { id } => {
                (ErrorCode::IssueNotFound, Some(json!({"searched_id": id})))
            }
            TrackerError::ViewNotFound { id } => {
                (ErrorCode::ViewNotFound, Some(json!({"searched_id": id})))
            }
            TrackerError::ComponentNotFound { id } => (
                ErrorCode::ComponentNotFound,
                Some(json!({"searched_id": id})),
            ),
            TrackerError::TeamNotFound { id } => {
                (ErrorCode::TeamNotFound, Some(json!({"searched_id": id})))
            }
            TrackerError::MissingIdentity => (ErrorCode::IdentityRequired, None),
            TrackerError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            TrackerError::ValidationErrors { errors } => (
                ErrorCode::ValidationFailed,
                Some(json!({
                    "errors": errors
                        .iter()
                        .map(|e| json!({"field": e.field, "reason": e.message}))
                        .collect::<Vec<_>>()
                })),
            ),
            TrackerError::InvalidStatus { status } => (
                ErrorCode::InvalidStatus,
                Some(json!({"provided": status})),
            ),
            TrackerError::InvalidPriority { priority } => (
                ErrorCode::InvalidPriority,
                Some(json!({"provided": priority})),
            ),
            TrackerError::InvalidSeverity { severity } => (
                ErrorCode::InvalidSeverity,
                Some(json!({"provided": severity})),
            ),
            TrackerError::InvalidUuid { field, value } => (
                ErrorCode::InvalidId,
                Some(json!({"field": field, "provided": value})),
            ),
            TrackerError::Config(_) => (ErrorCode::ConfigError, None),
            TrackerError::Io(_) => (ErrorCode::IoError, None),
            TrackerError::Json(_) => (ErrorCode::JsonError, None),
            TrackerError::Yaml(_) => (ErrorCode::YamlError, None),
            TrackerError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &TrackerError) -> Option<String> {
        match err {
            TrackerError::InvalidStatus { status } => detect_status_intent(status).map_or_else(
                || err.suggestion().map(str::to_string),
                |detected| Some(format!("Did you mean --status {detected}?")),
            ),
            TrackerError::IssueNotFound { .. } => {
                Some("Run 'bt list' to see available issues.".to_string())
            }
            TrackerError::ViewNotFound { .. } => {
                Some("Run 'bt view list' to see your saved views.".to_string())
            }
            TrackerError::ComponentNotFound { .. } => {
                Some("Run 'bt component list' or 'bt component create <name>'.".to_string())
            }
            TrackerError::TeamNotFound { .. } => {
                Some("Run 'bt team list' or 'bt team create <name>'.".to_string())
            }
            _ => err.suggestion().map(str::to_string),
        }
    }
}

/// Common spellings users reach for instead of the canonical status names.
static STATUS_SYNONYMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("open", "NEW"),
        ("todo", "NEW"),
        ("started", "IN_PROGRESS"),
        ("wip", "IN_PROGRESS"),
        ("inprogress", "IN_PROGRESS"),
        ("in-progress", "IN_PROGRESS"),
        ("done", "FIXED"),
        ("resolved", "FIXED"),
        ("wontfix", "WONT_FIX"),
        ("won't fix", "WONT_FIX"),
        ("dup", "DUPLICATE"),
        ("dupe", "DUPLICATE"),
    ]
    .into_iter()
    .collect()
});

const CANONICAL_STATUSES: &[&str] = &[
    "NEW",
    "ASSIGNED",
    "IN_PROGRESS",
    "FIXED",
    "VERIFIED",
    "CLOSED",
    "DUPLICATE",
    "WONT_FIX",
];

/// Detect what status the user likely meant.
fn detect_status_intent(input: &str) -> Option<&'static str> {
    let lower = input.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    if let Some(&canonical) = STATUS_SYNONYMS.get(lower.as_str()) {
        return Some(canonical);
    }

    let upper = lower.to_uppercase();
    CANONICAL_STATUSES
        .iter()
        .find(|status| status.starts_with(&upper))
        .copied()
}
