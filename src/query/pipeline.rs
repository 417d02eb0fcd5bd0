//! Filter string to page of issues.
//!
//! Page tokens are decimal offsets. A token that does not parse restarts at
//! the first page.

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, TrackerError};
use crate::model::{Identity, Issue};
use crate::query::predicate::compile_str;
use crate::storage::{IssueQueryExecutor, PageRequest};

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Filter applied by `list_issues` when none is given.
pub const DEFAULT_LIST_FILTER: &str = "is:open";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    /// 0 means `DEFAULT_PAGE_SIZE`.
    pub page_size: usize,
    pub page_token: Option<String>,
}

impl Pagination {
    #[must_use]
    pub fn new(page_size: usize, page_token: Option<String>) -> Self {
        Self {
            page_size,
            page_token,
        }
    }

    fn window(&self) -> PageRequest {
        let limit = if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        };
        let offset = self
            .page_token
            .as_deref()
            .and_then(|token| token.trim().parse::<usize>().ok())
            .unwrap_or(0);
        PageRequest { limit, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub issues: Vec<Issue>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Run `filter` for `identity` and return one page.
///
/// # Errors
///
/// Propagates executor failures unchanged.
pub fn search<E: IssueQueryExecutor + ?Sized>(
    executor: &E,
    filter: &str,
    identity: &Identity,
    pagination: &Pagination,
) -> Result<SearchResult> {
    let compiled = compile_str(filter, identity);
    let window = pagination.window();
    debug!(filter, params = compiled.params.len(), ?window, "Running search");

    let page = executor.execute(&compiled, window)?;

    let seen = window.offset.saturating_add(page.issues.len());
    let next_page_token = (!page.issues.is_empty() && seen < page.total).then(|| seen.to_string());

    Ok(SearchResult {
        issues: page.issues,
        total: page.total,
        next_page_token,
    })
}

/// List issues; a blank filter means open issues.
///
/// # Errors
///
/// Propagates executor failures unchanged.
pub fn list_issues<E: IssueQueryExecutor + ?Sized>(
    executor: &E,
    filter: &str,
    identity: &Identity,
    pagination: &Pagination,
) -> Result<SearchResult> {
    let filter = if filter.trim().is_empty() {
        DEFAULT_LIST_FILTER
    } else {
        filter
    };
    search(executor, filter, identity, pagination)
}

/// Search issues; the query must not be blank.
///
/// # Errors
///
/// Returns a validation error for a blank query, or the executor's error.
pub fn search_issues<E: IssueQueryExecutor + ?Sized>(
    executor: &E,
    query: &str,
    identity: &Identity,
    pagination: &Pagination,
) -> Result<SearchResult> {
    if query.trim().is_empty() {
        return Err(TrackerError::validation("query", "search query is required"));
    }
    search(executor, query, identity, pagination)
}
