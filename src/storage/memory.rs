//! In-memory executor.

use std::cmp::Reverse;

use crate::error::Result;
use crate::model::Issue;
use crate::query::{CompiledFilter, eval};
use crate::storage::{IssuePage, IssueQueryExecutor, PageRequest};

/// Evaluates compiled filters over a fixed set of issues.
#[derive(Debug, Clone, Default)]
pub struct MemoryExecutor {
    issues: Vec<Issue>,
}

impl MemoryExecutor {
    #[must_use]
    pub fn new(mut issues: Vec<Issue>) -> Self {
        issues.sort_by_key(|issue| Reverse((issue.created_at, issue.id)));
        Self { issues }
    }
}

impl IssueQueryExecutor for MemoryExecutor {
    fn execute(&self, filter: &CompiledFilter, page: PageRequest) -> Result<IssuePage> {
        let matching: Vec<&Issue> = self
            .issues
            .iter()
            .filter(|issue| eval::matches(filter, issue))
            .collect();

        let total = matching.len();
        let issues = matching
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect();

        Ok(IssuePage { issues, total })
    }
}
