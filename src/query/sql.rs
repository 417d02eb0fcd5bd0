//! SQLite rendering of compiled filters.
//!
//! Slot `i` becomes `?{i+1}`, so a placeholder may be referenced more than
//! once (free text compares title and description against one parameter).
//! Free-text needles are lowercased here and matched against
//! `fold_case(column)`, a function registered on every connection.

use std::fmt::Write as _;

use crate::query::predicate::{CompiledFilter, Field, Operator, Predicate, Value};
use crate::util::time::format_storage;

/// A rendered `WHERE` body and its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
    /// `None` when the filter matches everything.
    pub where_clause: Option<String>,
    pub params: Vec<String>,
}

impl SqlFilter {
    /// Parameters as `ToSql` references, in placeholder order.
    #[must_use]
    pub fn param_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params
            .iter()
            .map(|p| p as &dyn rusqlite::ToSql)
            .collect()
    }
}

/// Render a compiled filter for the `issues` table.
#[must_use]
pub fn render(filter: &CompiledFilter) -> SqlFilter {
    let where_clause = if filter.is_match_all() {
        None
    } else {
        let mut sql = String::new();
        render_node(&filter.predicate, &mut sql);
        Some(sql)
    };

    SqlFilter {
        where_clause,
        params: filter.params.iter().map(render_value).collect(),
    }
}

fn column(field: Field) -> &'static str {
    match field {
        Field::Status => "issues.status",
        Field::Priority => "issues.priority",
        Field::Severity => "issues.severity",
        Field::ComponentId => "issues.component_id",
        Field::AssigneeId => "issues.assignee_id",
        Field::ReporterId => "issues.reporter_id",
        Field::CreatedAt => "issues.created_at",
        Field::DueDate => "issues.due_date",
        // Never compared directly: teams compile to AlwaysFalse, labels
        // use EXISTS and text uses TextSearch.
        Field::Team | Field::Label | Field::Text => "NULL",
    }
}

fn render_node(node: &Predicate, sql: &mut String) {
    match node {
        Predicate::Compare { field, op, slot } => {
            let n = slot + 1;
            if *field == Field::Label {
                let _ = write!(
                    sql,
                    "EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = issues.id AND labels.label = ?{n})"
                );
                return;
            }
            let col = column(*field);
            let op = match op {
                Operator::NotEqual => "!=",
                Operator::AtLeast => ">=",
                Operator::AtMost => "<=",
                Operator::Equal | Operator::Contains | Operator::Substring | Operator::Absent => "=",
            };
            let _ = write!(sql, "{col} {op} ?{n}");
        }
        Predicate::IsNull { field } => {
            let _ = write!(sql, "{} IS NULL", column(*field));
        }
        Predicate::IsNotNull { field } => {
            let _ = write!(sql, "{} IS NOT NULL", column(*field));
        }
        Predicate::TextSearch { slot } => {
            let n = slot + 1;
            let _ = write!(
                sql,
                r"(fold_case(issues.title) LIKE ?{n} ESCAPE '\' OR fold_case(issues.description) LIKE ?{n} ESCAPE '\')"
            );
        }
        Predicate::And { children } => {
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    sql.push_str(" AND ");
                }
                render_node(child, sql);
            }
        }
        Predicate::AlwaysTrue => sql.push_str("1 = 1"),
        Predicate::AlwaysFalse => sql.push_str("1 = 0"),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Uuid(id) => id.to_string(),
        Value::Timestamp(ts) => format_storage(ts),
        Value::Substring(needle) => format!("%{}%", escape_like(&needle.to_lowercase())),
    }
}

/// Escape LIKE wildcards so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
