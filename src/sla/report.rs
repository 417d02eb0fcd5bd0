//! SLA reports: build the batch query, fetch, aggregate.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, TrackerError};
use crate::model::Identity;
use crate::query::{FilterClause, IdRef, compile};
use crate::sla::compliance::{RiskEntry, SlaStats, check_risk, compute_stats};
use crate::storage::{IssueQueryExecutor, PageRequest};
use crate::util::time::months_before;

pub const DEFAULT_RISK_THRESHOLD_HOURS: i64 = 4;
pub const DEFAULT_RISK_LIMIT: usize = 100;
pub const DEFAULT_STATS_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskRequest {
    pub team: Option<String>,
    pub include_closed: bool,
    pub threshold_hours: i64,
    pub limit: usize,
}

impl Default for RiskRequest {
    fn default() -> Self {
        Self {
            team: None,
            include_closed: false,
            threshold_hours: DEFAULT_RISK_THRESHOLD_HOURS,
            limit: DEFAULT_RISK_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub generated_at: DateTime<Utc>,
    pub threshold_hours: i64,
    pub entries: Vec<RiskEntry>,
    pub at_risk: usize,
    pub breached: usize,
}

/// Issues due within `threshold_hours` of `now`, including already
/// breached ones.
///
/// # Errors
///
/// Propagates executor failures unchanged.
pub fn risk_report<E: IssueQueryExecutor + ?Sized>(
    executor: &E,
    now: DateTime<Utc>,
    request: &RiskRequest,
) -> Result<RiskReport> {
    let horizon = TimeDelta::try_hours(request.threshold_hours)
        .and_then(|threshold| now.checked_add_signed(threshold))
        .ok_or_else(|| TrackerError::validation("threshold", "hours out of range"))?;
    let mut clauses = vec![FilterClause::DueBefore(horizon)];
    if !request.include_closed {
        clauses.push(FilterClause::Open);
    }
    if let Some(team) = &request.team {
        clauses.push(FilterClause::Team(team.clone()));
    }

    let filter = compile(&clauses, &Identity::anonymous());
    let limit = if request.limit == 0 {
        DEFAULT_RISK_LIMIT
    } else {
        request.limit
    };
    let page = executor.execute(&filter, PageRequest::first(limit))?;
    if page.total > page.issues.len() {
        debug!(
            total = page.total,
            fetched = page.issues.len(),
            "Risk scan truncated at limit"
        );
    }

    let entries = check_risk(&page.issues, now);
    let breached = entries.iter().filter(|entry| entry.is_breached()).count();
    let report = RiskReport {
        generated_at: now,
        threshold_hours: request.threshold_hours,
        at_risk: entries.len() - breached,
        breached,
        entries,
    };
    info!(
        at_risk = report.at_risk,
        breached = report.breached,
        "SLA risk scan complete"
    );
    Ok(report)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsRequest {
    pub component_id: Option<String>,
    pub team: Option<String>,
    /// Defaults to one month before `now`.
    pub start: Option<DateTime<Utc>>,
    /// Defaults to `now`.
    pub end: Option<DateTime<Utc>>,
    /// 0 means `DEFAULT_STATS_LIMIT`.
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub issues_scanned: usize,
    pub stats: SlaStats,
}

/// Compliance for issues created in `[start, end]` in a component or team.
///
/// # Errors
///
/// Returns a validation error when neither a component nor a team is given
/// or the window is inverted; otherwise propagates executor failures.
pub fn stats_report<E: IssueQueryExecutor + ?Sized>(
    executor: &E,
    now: DateTime<Utc>,
    request: &StatsRequest,
) -> Result<StatsReport> {
    if request.component_id.is_none() && request.team.is_none() {
        return Err(TrackerError::validation(
            "component",
            "either a component or a team is required",
        ));
    }

    let start = request.start.unwrap_or_else(|| months_before(now, 1));
    let end = request.end.unwrap_or(now);
    if start > end {
        return Err(TrackerError::validation("start", "must not be after end"));
    }

    let mut clauses = vec![
        FilterClause::CreatedAfter(start),
        FilterClause::CreatedBefore(end),
    ];
    if let Some(component) = &request.component_id {
        clauses.push(FilterClause::Component(IdRef::parse(component)));
    }
    if let Some(team) = &request.team {
        clauses.push(FilterClause::Team(team.clone()));
    }

    let limit = if request.limit == 0 {
        DEFAULT_STATS_LIMIT
    } else {
        request.limit
    };
    let filter = compile(&clauses, &Identity::anonymous());
    let page = executor.execute(&filter, PageRequest::first(limit))?;

    let stats = compute_stats(&page.issues);
    info!(
        scanned = page.issues.len(),
        counted = stats.total,
        compliance = stats.compliance_percentage,
        "SLA stats computed"
    );

    Ok(StatsReport {
        start,
        end,
        issues_scanned: page.issues.len(),
        stats,
    })
}
