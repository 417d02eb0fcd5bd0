#![allow(dead_code)]

use bugtrack::model::{Issue, Priority, Severity, Status};
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

/// Fixed base time so fixtures are deterministic.
pub fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_735_689_600, 0).unwrap() // 2025-01-01 00:00:00 UTC
}

pub fn component() -> Uuid {
    Uuid::from_u128(0xC0)
}

pub fn reporter() -> Uuid {
    Uuid::from_u128(0xAA)
}

pub fn issue(title: &str) -> Issue {
    Issue::new(title, component(), reporter(), base_time())
}

pub struct IssueBuilder {
    issue: Issue,
}

impl IssueBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            issue: issue(title),
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.issue.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.issue.priority = priority;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.issue.severity = severity;
        self
    }

    pub fn with_component(mut self, component: Uuid) -> Self {
        self.issue.component_id = component;
        self
    }

    pub fn with_assignee(mut self, assignee: Uuid) -> Self {
        self.issue.assignee_id = Some(assignee);
        self
    }

    pub fn with_reporter(mut self, reporter: Uuid) -> Self {
        self.issue.reporter_id = reporter;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.issue.description = description.to_string();
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.issue.labels = labels.iter().map(ToString::to_string).collect();
        self
    }

    /// Created `hours` after the base time.
    pub fn created_at_offset(mut self, hours: i64) -> Self {
        let ts = base_time() + Duration::hours(hours);
        self.issue.created_at = ts;
        self.issue.updated_at = ts;
        self
    }

    pub fn with_due(mut self, due: DateTime<Utc>) -> Self {
        self.issue.due_date = Some(due);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.issue.updated_at = updated_at;
        self
    }

    pub fn build(self) -> Issue {
        self.issue
    }
}
