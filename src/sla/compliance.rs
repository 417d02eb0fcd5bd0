//! Risk scan and compliance aggregation over a fetched batch of issues.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Issue, Priority, Severity, Status};

const SECS_PER_HOUR: i64 = 3_600;

/// An issue with a due date and the whole hours left until it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskEntry {
    pub issue_id: Uuid,
    pub title: String,
    pub priority: Priority,
    pub severity: Severity,
    pub status: Status,
    pub due_date: DateTime<Utc>,
    /// Floor of the remaining time in hours; negative once breached.
    pub hours_remaining: i64,
}

impl RiskEntry {
    #[must_use]
    pub const fn is_breached(&self) -> bool {
        self.hours_remaining < 0
    }
}

/// Counts for one slice of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComplianceBucket {
    pub total: u64,
    pub met: u64,
    pub missed: u64,
    pub compliance_percentage: f64,
}

impl ComplianceBucket {
    fn record(&mut self, met: bool) {
        self.total += 1;
        if met {
            self.met += 1;
        } else {
            self.missed += 1;
        }
    }

    fn finish(&mut self) {
        self.compliance_percentage = percentage(self.met, self.total);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlaStats {
    pub total: u64,
    pub met: u64,
    pub missed: u64,
    pub compliance_percentage: f64,
    pub by_priority: BTreeMap<String, ComplianceBucket>,
    pub by_severity: BTreeMap<String, ComplianceBucket>,
}

fn percentage(met: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        met as f64 / total as f64 * 100.0
    }
}

/// Floor of the signed hour difference, exact down to the nanosecond.
fn floor_hours(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = due - now;
    // num_seconds truncates toward zero; a negative fraction moves it down one.
    let secs = delta.num_seconds() - i64::from(delta.subsec_nanos() < 0);
    secs.div_euclid(SECS_PER_HOUR)
}

/// Every issue with a due date, in input order. Breached issues are kept.
#[must_use]
pub fn check_risk(issues: &[Issue], now: DateTime<Utc>) -> Vec<RiskEntry> {
    issues
        .iter()
        .filter_map(|issue| {
            let due_date = issue.due_date?;
            Some(RiskEntry {
                issue_id: issue.id,
                title: issue.title.clone(),
                priority: issue.priority.clone(),
                severity: issue.severity.clone(),
                status: issue.status.clone(),
                due_date,
                hours_remaining: floor_hours(due_date, now),
            })
        })
        .collect()
}

/// Compliance over resolved issues (`CLOSED` or `VERIFIED`) that have a due
/// date. An issue met its SLA iff it was last updated strictly before the
/// due date.
#[must_use]
pub fn compute_stats(issues: &[Issue]) -> SlaStats {
    let mut stats = SlaStats::default();
    let mut overall = ComplianceBucket::default();

    for issue in issues {
        let Some(due_date) = issue.due_date else {
            continue;
        };
        if !issue.status.counts_for_compliance() {
            continue;
        }

        let met = issue.updated_at < due_date;
        overall.record(met);
        stats
            .by_priority
            .entry(issue.priority.as_str().to_string())
            .or_default()
            .record(met);
        stats
            .by_severity
            .entry(issue.severity.as_str().to_string())
            .or_default()
            .record(met);
    }

    overall.finish();
    for bucket in stats
        .by_priority
        .values_mut()
        .chain(stats.by_severity.values_mut())
    {
        bucket.finish();
    }

    stats.total = overall.total;
    stats.met = overall.met;
    stats.missed = overall.missed;
    stats.compliance_percentage = overall.compliance_percentage;
    stats
}
