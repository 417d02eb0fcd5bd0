//! Issue storage.
//!
//! `IssueQueryExecutor` is the seam between the query engine and a backend:
//! it runs a compiled filter once for a page and once for the total count.
//! `SqliteStorage` is the persistent backend; `MemoryExecutor` holds issues
//! in a `Vec` and evaluates the predicate tree directly.

pub mod events;
mod memory;
pub mod schema;
mod sqlite;

pub use memory::MemoryExecutor;
pub use sqlite::SqliteStorage;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Issue, Priority, Severity, Status};
use crate::query::CompiledFilter;

/// Limit/offset window. Results are ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self { limit, offset: 0 }
    }
}

/// One page of matches plus the total across all pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    pub total: usize,
}

/// Runs compiled filters against a store of issues.
pub trait IssueQueryExecutor {
    /// Return the page selected by `page` and the unpaged match count.
    ///
    /// The count and the page are separate reads; under concurrent writes
    /// they may disagree.
    ///
    /// # Errors
    ///
    /// Backend failures are returned as `TrackerError::QueryExecution`.
    fn execute(&self, filter: &CompiledFilter, page: PageRequest) -> Result<IssuePage>;
}

/// Fields to update on an issue.
///
/// Outer `None` leaves the field alone. For `assignee_id` and `due_date`,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reproduce_steps: Option<Option<String>>,
    pub component_id: Option<Uuid>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub severity: Option<Severity>,
    pub assignee_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<chrono::DateTime<chrono::Utc>>>,
    pub add_labels: Vec<String>,
    pub remove_labels: Vec<String>,
}

impl IssueUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.reproduce_steps.is_none()
            && self.component_id.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.severity.is_none()
            && self.assignee_id.is_none()
            && self.due_date.is_none()
            && self.add_labels.is_empty()
            && self.remove_labels.is_empty()
    }
}
