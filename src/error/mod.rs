//! Error types and handling for `bugtrack`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for ad-hoc context
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for scripted callers

mod structured;

pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `bugtrack` operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    // === Storage Errors ===
    /// Database file not found at the specified path.
    #[error("Database not found at '{path}'")]
    DatabaseNotFound { path: PathBuf },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The issue query executor failed. The source is passed through untouched.
    #[error("Query execution failed: {source}")]
    QueryExecution {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // === Entity Errors ===
    /// Issue with the specified ID was not found.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    /// Saved view with the specified ID was not found.
    #[error("Saved view not found: {id}")]
    ViewNotFound { id: String },

    /// Component with the specified ID is not registered.
    #[error("Component not found: {id}")]
    ComponentNotFound { id: String },

    /// Team with the specified ID is not registered.
    #[error("Team not found: {id}")]
    TeamNotFound { id: String },

    /// Caller identity is required but was not supplied.
    #[error("No user identity: pass --user or set BT_USER")]
    MissingIdentity,

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors.
    #[error("Validation failed: {}", format_validation_errors(.errors))]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// Invalid priority value.
    #[error("Invalid priority: {priority}")]
    InvalidPriority { priority: String },

    /// Invalid severity value.
    #[error("Invalid severity: {severity}")]
    InvalidSeverity { severity: String },

    /// A value that should be a UUID is not one.
    #[error("Invalid {field} ID format: {value}")]
    InvalidUuid { field: String, value: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workspace not initialized.
    #[error("bugtrack not initialized: run 'bt init' first")]
    NotInitialized,

    /// Already initialized.
    #[error("Already initialized at '{path}'")]
    AlreadyInitialized { path: PathBuf },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrackerError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseNotFound { .. }
                | Self::NotInitialized
                | Self::IssueNotFound { .. }
                | Self::ViewNotFound { .. }
                | Self::ComponentNotFound { .. }
                | Self::TeamNotFound { .. }
                | Self::MissingIdentity
                | Self::Validation { .. }
                | Self::ValidationErrors { .. }
                | Self::InvalidStatus { .. }
                | Self::InvalidPriority { .. }
                | Self::InvalidSeverity { .. }
                | Self::InvalidUuid { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run: bt init"),
            Self::DatabaseNotFound { .. } => Some("Check path or run: bt init"),
            Self::AlreadyInitialized { .. } => Some("Use --force to reinitialize"),
            Self::MissingIdentity => Some("Pass --user <uuid> or set BT_USER"),
            Self::InvalidPriority { .. } => Some("Valid priorities: P0, P1, P2, P3, P4"),
            Self::InvalidSeverity { .. } => Some("Valid severities: S0, S1, S2, S3"),
            Self::InvalidStatus { .. } => Some(
                "Valid statuses: NEW, ASSIGNED, IN_PROGRESS, FIXED, VERIFIED, CLOSED, DUPLICATE, WONT_FIX",
            ),
            Self::InvalidUuid { .. } => {
                Some("IDs are UUIDs, e.g. 67e55044-10b1-426f-9247-bb680e5fe0c8")
            }
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a backend failure raised while running an issue query.
    #[must_use]
    pub fn query_execution(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::QueryExecution {
            source: Box::new(source),
        }
    }

    /// Parse a UUID-valued field, naming the field in the error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUuid` if `value` is not a UUID.
    pub fn parse_uuid(field: &str, value: &str) -> Result<uuid::Uuid> {
        uuid::Uuid::parse_str(value.trim()).map_err(|_| Self::InvalidUuid {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl TrackerError {
    /// Collapse a batch of validation failures into one error.
    #[must_use]
    pub fn from_validation_errors(mut errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = errors.remove(0);
            Self::Validation {
                field: err.field,
                reason: err.message,
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }
}

/// Result type using `TrackerError`.
pub type Result<T> = std::result::Result<T, TrackerError>;
