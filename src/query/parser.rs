//! Filter string parser.
//!
//! A filter is a whitespace-separated list of tokens. A token containing `:`
//! is split at the first colon into `key:value`; any other token is free
//! text. Keys are case-sensitive. Parsing never fails: unknown keys and
//! malformed dates are dropped, and values that cannot match anything are
//! kept so they compile to a never-matching predicate.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::model::{Priority, Severity, Status};
use crate::query::predicate::{Field, Operator};
use crate::util::time::parse_filter_date;

/// A UUID-valued filter argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRef {
    Id(Uuid),
    /// Not a UUID. Name lookups are unsupported, so this never matches.
    Invalid(String),
}

impl IdRef {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Uuid::parse_str(value).map_or_else(|_| Self::Invalid(value.to_string()), Self::Id)
    }
}

/// The argument of an `assignee:` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeRef {
    /// `assignee:me`, resolved against the caller at compile time.
    Me,
    /// `assignee:none` or `assignee:unassigned`.
    Unassigned,
    User(IdRef),
}

/// One parsed unit of a filter string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// `is:open`: status is anything but `CLOSED`.
    Open,
    /// `is:closed`
    Closed,
    Status(Status),
    Priority(Priority),
    Severity(Severity),
    Component(IdRef),
    Assignee(AssigneeRef),
    Reporter(IdRef),
    /// Team membership is not joined; always matches nothing.
    Team(String),
    Label(String),
    CreatedAfter(DateTime<Utc>),
    CreatedBefore(DateTime<Utc>),
    DueBefore(DateTime<Utc>),
    DueAfter(DateTime<Utc>),
    /// Case-insensitive substring of title or description.
    FreeText(String),
}

impl FilterClause {
    /// The issue attribute this clause constrains.
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Open | Self::Closed | Self::Status(_) => Field::Status,
            Self::Priority(_) => Field::Priority,
            Self::Severity(_) => Field::Severity,
            Self::Component(_) => Field::ComponentId,
            Self::Assignee(_) => Field::AssigneeId,
            Self::Reporter(_) => Field::ReporterId,
            Self::Team(_) => Field::Team,
            Self::Label(_) => Field::Label,
            Self::CreatedAfter(_) | Self::CreatedBefore(_) => Field::CreatedAt,
            Self::DueBefore(_) | Self::DueAfter(_) => Field::DueDate,
            Self::FreeText(_) => Field::Text,
        }
    }

    /// The comparison the clause performs, inferred from its key.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        match self {
            Self::Open => Operator::NotEqual,
            Self::Closed
            | Self::Status(_)
            | Self::Priority(_)
            | Self::Severity(_)
            | Self::Component(_)
            | Self::Reporter(_)
            | Self::Team(_) => Operator::Equal,
            Self::Assignee(AssigneeRef::Unassigned) => Operator::Absent,
            Self::Assignee(_) => Operator::Equal,
            Self::Label(_) => Operator::Contains,
            Self::CreatedAfter(_) | Self::DueAfter(_) => Operator::AtLeast,
            Self::CreatedBefore(_) | Self::DueBefore(_) => Operator::AtMost,
            Self::FreeText(_) => Operator::Substring,
        }
    }
}

/// Parse a filter string into clauses, in token order.
#[must_use]
pub fn parse(filter: &str) -> Vec<FilterClause> {
    filter.split_whitespace().filter_map(parse_token).collect()
}

fn parse_token(token: &str) -> Option<FilterClause> {
    let Some((key, value)) = token.split_once(':') else {
        return Some(FilterClause::FreeText(token.to_string()));
    };

    let clause = match key {
        "is" => match value {
            "open" => Some(FilterClause::Open),
            "closed" => Some(FilterClause::Closed),
            _ => None,
        },
        "status" => Some(FilterClause::Status(Status::parse_exact(value))),
        "priority" => Some(FilterClause::Priority(Priority::parse_exact(value))),
        "severity" => Some(FilterClause::Severity(Severity::parse_exact(value))),
        "component" => Some(FilterClause::Component(IdRef::parse(value))),
        "assignee" => Some(FilterClause::Assignee(match value {
            "me" => AssigneeRef::Me,
            "none" | "unassigned" => AssigneeRef::Unassigned,
            other => AssigneeRef::User(IdRef::parse(other)),
        })),
        "reporter" => Some(FilterClause::Reporter(IdRef::parse(value))),
        "team" => Some(FilterClause::Team(value.to_string())),
        "label" => Some(FilterClause::Label(value.to_string())),
        "after" | "created_after" => parse_filter_date(value).map(FilterClause::CreatedAfter),
        "before" | "created_before" => parse_filter_date(value).map(FilterClause::CreatedBefore),
        "due_before" => parse_filter_date(value).map(FilterClause::DueBefore),
        "due_after" => parse_filter_date(value).map(FilterClause::DueAfter),
        _ => None,
    };

    if clause.is_none() {
        debug!(token, "Dropping filter clause");
    }
    clause
}
