//! Validation helpers for `bugtrack`.
//!
//! These routines enforce field constraints and return structured
//! validation errors without touching storage.

use crate::error::ValidationError;
use crate::model::{Comment, Issue, SavedView};

const MAX_TITLE: usize = 500;
const MAX_TEXT: usize = 102_400;
const MAX_LABEL: usize = 50;
const MAX_VIEW_NAME: usize = 100;
const MAX_REGISTRY_NAME: usize = 100;

/// Validates issue fields and invariants.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate an issue and return all validation errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate(issue: &Issue) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if issue.title.trim().is_empty() {
            errors.push(ValidationError::new("title", "cannot be empty"));
        }
        if issue.title.chars().count() > MAX_TITLE {
            errors.push(ValidationError::new("title", "exceeds 500 characters"));
        }

        if issue.description.len() > MAX_TEXT {
            errors.push(ValidationError::new("description", "exceeds 100KB"));
        }
        if issue
            .reproduce_steps
            .as_ref()
            .is_some_and(|steps| steps.len() > MAX_TEXT)
        {
            errors.push(ValidationError::new("reproduce_steps", "exceeds 100KB"));
        }

        if issue.updated_at < issue.created_at {
            errors.push(ValidationError::new(
                "updated_at",
                "cannot be before created_at",
            ));
        }

        for label in &issue.labels {
            if let Err(err) = LabelValidator::validate(label) {
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validates a single label value.
pub struct LabelValidator;

impl LabelValidator {
    /// Validate a label for length and allowed characters.
    ///
    /// Labels must survive a round trip through a `label:<value>` filter
    /// token, so whitespace is rejected.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the label is invalid.
    pub fn validate(label: &str) -> Result<(), ValidationError> {
        if label.is_empty() {
            return Err(ValidationError::new("label", "cannot be empty"));
        }

        if label.len() > MAX_LABEL {
            return Err(ValidationError::new("label", "exceeds 50 characters"));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':' || c == '.')
        {
            return Err(ValidationError::new(
                "label",
                "invalid characters (only alphanumeric, hyphen, underscore, colon, dot allowed)",
            ));
        }

        Ok(())
    }
}

/// Validates comment fields.
pub struct CommentValidator;

impl CommentValidator {
    /// # Errors
    ///
    /// Returns a `ValidationError` for empty or oversized content.
    pub fn validate(comment: &Comment) -> Result<(), ValidationError> {
        if comment.content.trim().is_empty() {
            return Err(ValidationError::new("content", "cannot be empty"));
        }

        if comment.content.len() > MAX_TEXT {
            return Err(ValidationError::new("content", "exceeds 100KB"));
        }

        Ok(())
    }
}

/// Validates saved view fields.
pub struct ViewValidator;

impl ViewValidator {
    /// # Errors
    ///
    /// Returns all violations found.
    pub fn validate(view: &SavedView) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if view.name.trim().is_empty() {
            errors.push(ValidationError::new("name", "cannot be empty"));
        }
        if view.name.chars().count() > MAX_VIEW_NAME {
            errors.push(ValidationError::new("name", "exceeds 100 characters"));
        }
        if view.query_string.trim().is_empty() {
            errors.push(ValidationError::new("query", "cannot be empty"));
        }
        if view.is_team_view && view.team_id.is_none() {
            errors.push(ValidationError::new("team_id", "required for team views"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validates team and component names.
pub struct RegistryValidator;

impl RegistryValidator {
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate_name(name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::new("name", "cannot be empty"));
        }
        if name.chars().count() > MAX_REGISTRY_NAME {
            return Err(ValidationError::new("name", "exceeds 100 characters"));
        }
        Ok(())
    }
}
