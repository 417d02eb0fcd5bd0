//! SLA target computation.
//!
//! Pure: the caller supplies `now`. Hours are calendar hours; there is no
//! business-day or holiday adjustment.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::model::{Priority, Severity};

/// Base hours when the priority is not recognized.
pub const FALLBACK_HOURS: i64 = 72;

/// Computed SLA target. Not persisted; callers store `target_date` as the
/// issue's due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlaTarget {
    pub priority: Priority,
    pub severity: Severity,
    pub hours: i64,
    pub target_date: DateTime<Utc>,
    /// Display text only; never parsed back.
    pub description: String,
}

#[must_use]
pub fn base_hours(priority: &Priority) -> i64 {
    match priority {
        Priority::P0 => 4,
        Priority::P1 => 24,
        Priority::P2 => 72,
        Priority::P3 => 168,
        Priority::P4 => 336,
        Priority::Custom(_) => FALLBACK_HOURS,
    }
}

/// Apply the severity multiplier, truncating toward zero.
#[must_use]
pub fn adjust_for_severity(hours: i64, severity: &Severity) -> i64 {
    match severity {
        Severity::S0 => hours / 2,
        Severity::S1 => hours * 3 / 4,
        Severity::S2 | Severity::Custom(_) => hours,
        Severity::S3 => hours * 3 / 2,
    }
}

#[must_use]
pub fn target_hours(priority: &Priority, severity: &Severity) -> i64 {
    adjust_for_severity(base_hours(priority), severity)
}

#[must_use]
pub fn calculate_target(priority: &Priority, severity: &Severity, now: DateTime<Utc>) -> SlaTarget {
    let hours = target_hours(priority, severity);
    let target_date = now + Duration::hours(hours);
    let description = format!(
        "Target resolution time: {hours} hours ({})",
        target_date.format("%Y-%m-%d %H:%M:%S")
    );

    SlaTarget {
        priority: priority.clone(),
        severity: severity.clone(),
        hours,
        target_date,
        description,
    }
}
