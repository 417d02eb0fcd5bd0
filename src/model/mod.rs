//! Core data types for `bugtrack`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `Issue` - The core work item
//! - `Status` - Issue lifecycle states
//! - `Priority` / `Severity` - SLA inputs
//! - `Comment` - Issue comments
//! - `SavedView` - Named filter strings
//! - `Team` / `Component` - Registry entries issues are filed against
//! - `Identity` - The caller on whose behalf a command runs
//! - `Event` - Audit trail entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TrackerError;

/// Canonical form for enum-like inputs: `in progress`, `in-progress` and
/// `In_Progress` all become `IN_PROGRESS`.
fn canonical_token(s: &str) -> String {
    s.trim()
        .replace(['\'', '\u{2019}'], "")
        .replace([' ', '-'], "_")
        .to_uppercase()
}

fn exact_variant<T: Clone>(known: &[T], as_str: fn(&T) -> &str, s: &str) -> Option<T> {
    known.iter().find(|variant| as_str(variant) == s).cloned()
}

/// Issue lifecycle status.
///
/// `NEW → ASSIGNED → IN_PROGRESS → {FIXED → VERIFIED → CLOSED} | DUPLICATE | WONT_FIX`.
/// Transitions are not enforced; values outside the known set are kept as
/// `Custom` so they can still be stored and compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    New,
    Assigned,
    InProgress,
    Fixed,
    Verified,
    Closed,
    Duplicate,
    WontFix,
    Custom(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "NEW",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Fixed => "FIXED",
            Self::Verified => "VERIFIED",
            Self::Closed => "CLOSED",
            Self::Duplicate => "DUPLICATE",
            Self::WontFix => "WONT_FIX",
            Self::Custom(value) => value,
        }
    }

    const KNOWN: [Self; 8] = [
        Self::New,
        Self::Assigned,
        Self::InProgress,
        Self::Fixed,
        Self::Verified,
        Self::Closed,
        Self::Duplicate,
        Self::WontFix,
    ];

    /// Map a stored or user-typed value to a status, keeping unknown values verbatim.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        Self::known(s).unwrap_or_else(|| Self::Custom(s.to_string()))
    }

    /// Filter form: only the canonical spelling is a known status.
    #[must_use]
    pub fn parse_exact(s: &str) -> Self {
        exact_variant(&Self::KNOWN, Self::as_str, s).unwrap_or_else(|| Self::Custom(s.to_string()))
    }

    fn known(s: &str) -> Option<Self> {
        match canonical_token(s).as_str() {
            "NEW" => Some(Self::New),
            "ASSIGNED" => Some(Self::Assigned),
            "IN_PROGRESS" | "INPROGRESS" => Some(Self::InProgress),
            "FIXED" => Some(Self::Fixed),
            "VERIFIED" => Some(Self::Verified),
            "CLOSED" => Some(Self::Closed),
            "DUPLICATE" => Some(Self::Duplicate),
            "WONT_FIX" | "WONTFIX" => Some(Self::WontFix),
            _ => None,
        }
    }

    /// Only resolved-and-confirmed issues count toward SLA compliance.
    #[must_use]
    pub const fn counts_for_compliance(&self) -> bool {
        matches!(self, Self::Closed | Self::Verified)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::known(s).ok_or_else(|| TrackerError::InvalidStatus {
            status: s.to_string(),
        })
    }
}

/// Issue priority (`P0` = critical, `P4` = trivial).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    P0,
    P1,
    #[default]
    P2,
    P3,
    P4,
    Custom(String),
}

impl Priority {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::Custom(value) => value,
        }
    }

    const KNOWN: [Self; 5] = [Self::P0, Self::P1, Self::P2, Self::P3, Self::P4];

    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        Self::known(s).unwrap_or_else(|| Self::Custom(s.to_string()))
    }

    /// Filter form: `P1` is known, `p1` and `1` are not.
    #[must_use]
    pub fn parse_exact(s: &str) -> Self {
        exact_variant(&Self::KNOWN, Self::as_str, s).unwrap_or_else(|| Self::Custom(s.to_string()))
    }

    fn known(s: &str) -> Option<Self> {
        let token = canonical_token(s);
        match token.strip_prefix('P').unwrap_or(&token) {
            "0" => Some(Self::P0),
            "1" => Some(Self::P1),
            "2" => Some(Self::P2),
            "3" => Some(Self::P3),
            "4" => Some(Self::P4),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::known(s).ok_or_else(|| TrackerError::InvalidPriority {
            priority: s.to_string(),
        })
    }
}

/// Issue severity (`S0` = system down, `S3` = cosmetic).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    S0,
    S1,
    #[default]
    S2,
    S3,
    Custom(String),
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::S0 => "S0",
            Self::S1 => "S1",
            Self::S2 => "S2",
            Self::S3 => "S3",
            Self::Custom(value) => value,
        }
    }

    const KNOWN: [Self; 4] = [Self::S0, Self::S1, Self::S2, Self::S3];

    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        Self::known(s).unwrap_or_else(|| Self::Custom(s.to_string()))
    }

    #[must_use]
    pub fn parse_exact(s: &str) -> Self {
        exact_variant(&Self::KNOWN, Self::as_str, s).unwrap_or_else(|| Self::Custom(s.to_string()))
    }

    fn known(s: &str) -> Option<Self> {
        let token = canonical_token(s);
        match token.strip_prefix('S').unwrap_or(&token) {
            "0" => Some(Self::S0),
            "1" => Some(Self::S1),
            "2" => Some(Self::S2),
            "3" => Some(Self::S3),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::known(s).ok_or_else(|| TrackerError::InvalidSeverity {
            severity: s.to_string(),
        })
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                Ok(Self::parse_lenient(&value))
            }
        }
    };
}

string_serde!(Status);
string_serde!(Priority);
string_serde!(Severity);
string_serde!(EventType);

/// The primary issue entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub id: Uuid,

    /// Title (1-500 chars).
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Steps to reproduce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reproduce_steps: Option<String>,

    pub component_id: Uuid,

    pub reporter_id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Uuid>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub status: Status,

    /// SLA target, assigned at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub labels: Vec<String>,
}

impl Issue {
    /// A fresh `NEW` issue with both timestamps set to `now`.
    #[must_use]
    pub fn new(title: &str, component_id: Uuid, reporter_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            reproduce_steps: None,
            component_id,
            reporter_id,
            assignee_id: None,
            priority: Priority::default(),
            severity: Severity::default(),
            status: Status::New,
            due_date: None,
            created_at: now,
            updated_at: now,
            labels: Vec::new(),
        }
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named, reusable filter string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedView {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    #[serde(default)]
    pub is_team_view: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    pub query_string: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A team that owns components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub lead_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product area issues are filed against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Component {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Created,
    Updated,
    StatusChanged,
    PriorityChanged,
    SeverityChanged,
    AssigneeChanged,
    DueDateChanged,
    Commented,
    LabelAdded,
    LabelRemoved,
    Custom(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::StatusChanged => "status_changed",
            Self::PriorityChanged => "priority_changed",
            Self::SeverityChanged => "severity_changed",
            Self::AssigneeChanged => "assignee_changed",
            Self::DueDateChanged => "due_date_changed",
            Self::Commented => "commented",
            Self::LabelAdded => "label_added",
            Self::LabelRemoved => "label_removed",
            Self::Custom(value) => value,
        }
    }

    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "status_changed" => Self::StatusChanged,
            "priority_changed" => Self::PriorityChanged,
            "severity_changed" => Self::SeverityChanged,
            "assignee_changed" => Self::AssigneeChanged,
            "due_date_changed" => Self::DueDateChanged,
            "commented" => Self::Commented,
            "label_added" => Self::LabelAdded,
            "label_removed" => Self::LabelRemoved,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// An audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub issue_id: Uuid,
    pub event_type: EventType,
    /// User id of the caller, as text.
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The caller a command acts for.
///
/// Resolved by the calling layer (CLI flag, env, config) and passed down
/// explicitly; nothing below the CLI reads ambient identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Identity {
    pub user_id: Option<Uuid>,
}

impl Identity {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    #[must_use]
    pub const fn user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// The user id, or `MissingIdentity` for commands that need one.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentity` when no user was resolved.
    pub fn require(&self) -> crate::error::Result<Uuid> {
        self.user_id.ok_or(TrackerError::MissingIdentity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_custom_roundtrip() {
        let status: Status = serde_json::from_str("\"Triage\"").unwrap();
        assert_eq!(status, Status::Custom("Triage".to_string()));
        let serialized = serde_json::to_string(&status).unwrap();
        assert_eq!(serialized, "\"Triage\"");
    }

    #[test]
    fn status_accepts_display_spellings() {
        assert_eq!("In Progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("won't fix".parse::<Status>().unwrap(), Status::WontFix);
        assert_eq!("closed".parse::<Status>().unwrap(), Status::Closed);
        assert!("shipped".parse::<Status>().is_err());
    }

    #[test]
    fn status_classification() {
        assert!(Status::Verified.counts_for_compliance());
        assert!(Status::Closed.counts_for_compliance());
        assert!(!Status::Fixed.counts_for_compliance());
        assert!(!Status::Custom("CLOSED-ish".into()).counts_for_compliance());
    }

    #[test]
    fn priority_and_severity_parse() {
        assert_eq!("p1".parse::<Priority>().unwrap(), Priority::P1);
        assert_eq!("4".parse::<Priority>().unwrap(), Priority::P4);
        assert!("P5".parse::<Priority>().is_err());
        assert_eq!(Priority::parse_lenient("P9"), Priority::Custom("P9".into()));

        assert_eq!("S0".parse::<Severity>().unwrap(), Severity::S0);
        assert!("S4".parse::<Severity>().is_err());
        assert_eq!(Severity::parse_lenient("low"), Severity::Custom("low".into()));
    }

    #[test]
    fn exact_parse_only_accepts_canonical_spelling() {
        assert_eq!(Priority::parse_exact("P1"), Priority::P1);
        assert_eq!(Priority::parse_exact("1"), Priority::Custom("1".into()));
        assert_eq!(Priority::parse_exact("p1"), Priority::Custom("p1".into()));
        assert_eq!(Severity::parse_exact("3"), Severity::Custom("3".into()));
        assert_eq!(Status::parse_exact("IN_PROGRESS"), Status::InProgress);
        assert_eq!(Status::parse_exact("fixed"), Status::Custom("fixed".into()));
        assert_eq!(Status::parse_exact("WONTFIX"), Status::Custom("WONTFIX".into()));
    }

    #[test]
    fn test_issue_serialization() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut issue = Issue::new("Login crash", Uuid::nil(), Uuid::nil(), now);
        issue.priority = Priority::P1;
        issue.severity = Severity::S0;

        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains("\"title\":\"Login crash\""));
        assert!(json.contains("\"status\":\"NEW\""));
        assert!(json.contains("\"priority\":\"P1\""));
        assert!(json.contains("\"severity\":\"S0\""));
        assert!(!json.contains("assignee_id"));
        assert!(!json.contains("labels"));

        let back: Issue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, issue);
    }

    #[test]
    fn event_type_roundtrip() {
        assert_eq!(EventType::parse_lenient("status_changed"), EventType::StatusChanged);
        assert_eq!(EventType::parse_lenient("archived"), EventType::Custom("archived".into()));
        assert_eq!(
            serde_json::to_string(&EventType::AssigneeChanged).unwrap(),
            "\"assignee_changed\""
        );
    }

    #[test]
    fn identity_require() {
        assert!(Identity::anonymous().require().is_err());
        let id = Uuid::new_v4();
        assert_eq!(Identity::user(id).require().unwrap(), id);
    }
}
