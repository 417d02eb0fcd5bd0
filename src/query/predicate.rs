//! Predicate compiler.
//!
//! Turns parsed clauses into a backend-neutral predicate tree plus an ordered
//! parameter list. Leaves refer to parameters by slot index, so each backend
//! renders its own placeholder syntax (see `query::sql`) or evaluates the
//! tree directly (see `query::eval`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::Identity;
use crate::query::parser::{self, AssigneeRef, FilterClause, IdRef};

/// Issue attribute a clause or comparison targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Status,
    Priority,
    Severity,
    ComponentId,
    AssigneeId,
    ReporterId,
    Team,
    Label,
    CreatedAt,
    DueDate,
    /// Title or description.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    AtLeast,
    AtMost,
    /// Set membership (labels).
    Contains,
    Substring,
    Absent,
}

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// Needle for a case-insensitive substring match, without wildcards.
    Substring(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        field: Field,
        op: Operator,
        slot: usize,
    },
    IsNull {
        field: Field,
    },
    IsNotNull {
        field: Field,
    },
    /// Title contains the needle OR description contains it. Both sides
    /// share the one slot.
    TextSearch {
        slot: usize,
    },
    And {
        children: Vec<Self>,
    },
    AlwaysTrue,
    AlwaysFalse,
}

impl Predicate {
    fn collect_slots(&self, out: &mut Vec<usize>) {
        match self {
            Self::Compare { slot, .. } | Self::TextSearch { slot } => out.push(*slot),
            Self::And { children } => {
                for child in children {
                    child.collect_slots(out);
                }
            }
            Self::IsNull { .. } | Self::IsNotNull { .. } | Self::AlwaysTrue | Self::AlwaysFalse => {}
        }
    }
}

/// Compiled filter, reused verbatim for the page query and the count query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledFilter {
    pub predicate: Predicate,
    pub params: Vec<Value>,
}

impl CompiledFilter {
    /// Matches every issue.
    #[must_use]
    pub const fn match_all() -> Self {
        Self {
            predicate: Predicate::AlwaysTrue,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_match_all(&self) -> bool {
        matches!(self.predicate, Predicate::AlwaysTrue)
    }

    /// Slots in the order they appear in the tree.
    #[must_use]
    pub fn slots(&self) -> Vec<usize> {
        let mut slots = Vec::with_capacity(self.params.len());
        self.predicate.collect_slots(&mut slots);
        slots
    }

    /// Parameter for a slot.
    #[must_use]
    pub fn param(&self, slot: usize) -> Option<&Value> {
        self.params.get(slot)
    }
}

#[derive(Default)]
struct Binder {
    params: Vec<Value>,
}

impl Binder {
    fn bind(&mut self, value: Value) -> usize {
        self.params.push(value);
        self.params.len() - 1
    }

    fn compare(&mut self, field: Field, op: Operator, value: Value) -> Predicate {
        let slot = self.bind(value);
        Predicate::Compare { field, op, slot }
    }

    fn id_equal(&mut self, field: Field, id: &IdRef) -> Predicate {
        match id {
            IdRef::Id(uuid) => self.compare(field, Operator::Equal, Value::Uuid(*uuid)),
            IdRef::Invalid(_) => Predicate::AlwaysFalse,
        }
    }

    fn leaf(&mut self, clause: &FilterClause, identity: &Identity) -> Predicate {
        let field = clause.field();
        let op = clause.operator();
        match clause {
            FilterClause::Open | FilterClause::Closed => {
                self.compare(field, op, Value::Text("CLOSED".to_string()))
            }
            FilterClause::Status(status) => {
                self.compare(field, op, Value::Text(status.as_str().to_string()))
            }
            FilterClause::Priority(priority) => {
                self.compare(field, op, Value::Text(priority.as_str().to_string()))
            }
            FilterClause::Severity(severity) => {
                self.compare(field, op, Value::Text(severity.as_str().to_string()))
            }
            FilterClause::Component(id) | FilterClause::Reporter(id) => self.id_equal(field, id),
            FilterClause::Assignee(AssigneeRef::Me) => match identity.user_id {
                Some(user) => self.compare(field, Operator::Equal, Value::Uuid(user)),
                None => Predicate::IsNotNull { field },
            },
            FilterClause::Assignee(AssigneeRef::Unassigned) => Predicate::IsNull { field },
            FilterClause::Assignee(AssigneeRef::User(id)) => self.id_equal(field, id),
            FilterClause::Team(_) => Predicate::AlwaysFalse,
            FilterClause::Label(label) => self.compare(field, op, Value::Text(label.clone())),
            FilterClause::CreatedAfter(ts)
            | FilterClause::CreatedBefore(ts)
            | FilterClause::DueBefore(ts)
            | FilterClause::DueAfter(ts) => self.compare(field, op, Value::Timestamp(*ts)),
            FilterClause::FreeText(text) => {
                let slot = self.bind(Value::Substring(text.clone()));
                Predicate::TextSearch { slot }
            }
        }
    }
}

/// Compile clauses into one conjunctive predicate.
///
/// `assignee:me` resolves to `identity` when a user is present and to
/// "has any assignee" otherwise.
///
/// # Panics
///
/// Panics if the tree's slots are not exactly `0..params.len()` in order.
/// That is a compiler bug, not a user error.
#[must_use]
pub fn compile(clauses: &[FilterClause], identity: &Identity) -> CompiledFilter {
    if clauses.is_empty() {
        return CompiledFilter::match_all();
    }

    let mut binder = Binder::default();
    let children = clauses
        .iter()
        .map(|clause| binder.leaf(clause, identity))
        .collect();

    let compiled = CompiledFilter {
        predicate: Predicate::And { children },
        params: binder.params,
    };

    let slots = compiled.slots();
    assert!(
        slots.iter().copied().eq(0..compiled.params.len()),
        "parameter slots out of order: {slots:?} for {} params",
        compiled.params.len()
    );

    compiled
}

/// Parse and compile a filter string.
#[must_use]
pub fn compile_str(filter: &str, identity: &Identity) -> CompiledFilter {
    compile(&parser::parse(filter), identity)
}
