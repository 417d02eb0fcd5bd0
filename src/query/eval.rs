//! In-memory evaluation of compiled filters.
//!
//! Mirrors the SQLite rendering: missing values never satisfy a comparison,
//! and text matching folds case with Unicode rules, like `fold_case` there.

use uuid::Uuid;

use crate::model::Issue;
use crate::query::predicate::{CompiledFilter, Field, Operator, Predicate, Value};

/// Does `issue` satisfy `filter`?
#[must_use]
pub fn matches(filter: &CompiledFilter, issue: &Issue) -> bool {
    eval(&filter.predicate, filter, issue)
}

fn eval(node: &Predicate, filter: &CompiledFilter, issue: &Issue) -> bool {
    match node {
        Predicate::AlwaysTrue => true,
        Predicate::AlwaysFalse => false,
        Predicate::And { children } => children.iter().all(|child| eval(child, filter, issue)),
        Predicate::IsNull { field } => is_null(*field, issue),
        Predicate::IsNotNull { field } => !is_null(*field, issue),
        Predicate::TextSearch { slot } => match filter.param(*slot) {
            Some(Value::Substring(needle)) => {
                contains_ci(&issue.title, needle) || contains_ci(&issue.description, needle)
            }
            _ => false,
        },
        Predicate::Compare { field, op, slot } => filter
            .param(*slot)
            .is_some_and(|value| compare(*field, *op, value, issue)),
    }
}

fn is_null(field: Field, issue: &Issue) -> bool {
    match field {
        Field::AssigneeId => issue.assignee_id.is_none(),
        Field::DueDate => issue.due_date.is_none(),
        _ => false,
    }
}

fn compare(field: Field, op: Operator, value: &Value, issue: &Issue) -> bool {
    match (field, value) {
        (Field::Status, Value::Text(v)) => compare_text(issue.status.as_str(), op, v),
        (Field::Priority, Value::Text(v)) => compare_text(issue.priority.as_str(), op, v),
        (Field::Severity, Value::Text(v)) => compare_text(issue.severity.as_str(), op, v),
        (Field::Label, Value::Text(v)) => {
            op == Operator::Contains && issue.labels.iter().any(|label| label == v)
        }
        (Field::ComponentId, Value::Uuid(v)) => compare_id(Some(issue.component_id), op, *v),
        (Field::ReporterId, Value::Uuid(v)) => compare_id(Some(issue.reporter_id), op, *v),
        (Field::AssigneeId, Value::Uuid(v)) => compare_id(issue.assignee_id, op, *v),
        (Field::CreatedAt, Value::Timestamp(v)) => compare_ord(&issue.created_at, op, v),
        (Field::DueDate, Value::Timestamp(v)) => {
            issue.due_date.as_ref().is_some_and(|due| compare_ord(due, op, v))
        }
        _ => false,
    }
}

fn compare_text(actual: &str, op: Operator, expected: &str) -> bool {
    match op {
        Operator::Equal => actual == expected,
        Operator::NotEqual => actual != expected,
        _ => false,
    }
}

fn compare_id(actual: Option<Uuid>, op: Operator, expected: Uuid) -> bool {
    actual.is_some_and(|id| match op {
        Operator::Equal => id == expected,
        Operator::NotEqual => id != expected,
        _ => false,
    })
}

fn compare_ord<T: Ord>(actual: &T, op: Operator, bound: &T) -> bool {
    match op {
        Operator::AtLeast => actual >= bound,
        Operator::AtMost => actual <= bound,
        Operator::Equal => actual == bound,
        Operator::NotEqual => actual != bound,
        _ => false,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.to_lowercase())
}
