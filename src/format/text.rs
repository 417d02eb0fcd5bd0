//! Plain text formatting for terminal output.
//!
//! - Status icons
//! - Priority / severity badges
//! - Issue lines, detail blocks, SLA reports

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use uuid::Uuid;

use crate::model::{Comment, Component, Event, Issue, SavedView, Status, Team};
use crate::sla::{RiskReport, SlaTarget, StatsReport};

/// Status icon characters.
pub mod icons {
    /// Not yet being worked on.
    pub const OPEN: &str = "○";
    /// Assigned or in progress.
    pub const ACTIVE: &str = "◐";
    /// Fixed, awaiting verification.
    pub const FIXED: &str = "●";
    /// Verified or closed.
    pub const DONE: &str = "✓";
    /// Duplicate or won't fix.
    pub const REJECTED: &str = "✗";
    pub const UNKNOWN: &str = "?";
}

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[must_use]
pub const fn format_status_icon(status: &Status) -> &'static str {
    match status {
        Status::New => icons::OPEN,
        Status::Assigned | Status::InProgress => icons::ACTIVE,
        Status::Fixed => icons::FIXED,
        Status::Verified | Status::Closed => icons::DONE,
        Status::Duplicate | Status::WontFix => icons::REJECTED,
        Status::Custom(_) => icons::UNKNOWN,
    }
}

/// First eight hex digits, enough to eyeball an id in a list.
#[must_use]
pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Determine terminal width from environment (falls back to 80).
#[must_use]
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|columns| columns.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(80)
}

/// Truncate a title to fit within `max_len` visible columns.
///
/// Handles wide characters (emojis, CJK) using `unicode-width`.
#[must_use]
pub fn truncate_title(title: &str, max_len: usize) -> String {
    if UnicodeWidthStr::width(title) <= max_len {
        return title.to_string();
    }
    let (budget, ellipsis) = if max_len <= 3 {
        (max_len, "")
    } else {
        (max_len - 3, "...")
    };

    let mut width = 0;
    let mut out = String::new();
    for c in title.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > budget {
            break;
        }
        width += cw;
        out.push(c);
    }
    out.push_str(ellipsis);
    out
}

/// Single-line summary: `{icon} {short id} [{priority}/{severity}] {status} {title}`.
#[must_use]
pub fn format_issue_line(issue: &Issue, max_width: Option<usize>) -> String {
    let prefix = format!(
        "{} {} [{}/{}] {} ",
        format_status_icon(&issue.status),
        short_id(&issue.id),
        issue.priority,
        issue.severity,
        issue.status
    );
    let title = max_width.map_or_else(
        || issue.title.clone(),
        |width| truncate_title(&issue.title, width.saturating_sub(UnicodeWidthStr::width(prefix.as_str()))),
    );
    format!("{prefix}{title}")
}

fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format(DATE_FORMAT).to_string()
}

fn format_opt_uuid(id: Option<&Uuid>) -> String {
    id.map_or_else(|| "-".to_string(), ToString::to_string)
}

/// Multi-line detail block for `show`.
#[must_use]
pub fn format_issue_details(issue: &Issue, comments: &[Comment]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", format_status_icon(&issue.status), issue.title);
    let _ = writeln!(out, "  ID:        {}", issue.id);
    let _ = writeln!(out, "  Status:    {}", issue.status);
    let _ = writeln!(out, "  Priority:  {}", issue.priority);
    let _ = writeln!(out, "  Severity:  {}", issue.severity);
    let _ = writeln!(out, "  Component: {}", issue.component_id);
    let _ = writeln!(out, "  Reporter:  {}", issue.reporter_id);
    let _ = writeln!(out, "  Assignee:  {}", format_opt_uuid(issue.assignee_id.as_ref()));
    let _ = writeln!(
        out,
        "  Due:       {}",
        issue.due_date.as_ref().map_or_else(|| "-".to_string(), format_date)
    );
    let _ = writeln!(out, "  Created:   {}", format_date(&issue.created_at));
    let _ = writeln!(out, "  Updated:   {}", format_date(&issue.updated_at));
    if !issue.labels.is_empty() {
        let _ = writeln!(out, "  Labels:    {}", issue.labels.join(", "));
    }
    if !issue.description.is_empty() {
        let _ = writeln!(out, "\n{}", issue.description);
    }
    if let Some(steps) = &issue.reproduce_steps {
        let _ = writeln!(out, "\nSteps to reproduce:\n{steps}");
    }
    if !comments.is_empty() {
        let _ = writeln!(out, "\nComments ({}):", comments.len());
        for comment in comments {
            let _ = writeln!(out, "{}", format_comment(comment));
        }
    }
    out
}

#[must_use]
pub fn format_comment(comment: &Comment) -> String {
    format!(
        "  [{}] {}: {}",
        format_date(&comment.created_at),
        short_id(&comment.author_id),
        comment.content
    )
}

#[must_use]
pub fn format_event(event: &Event) -> String {
    let mut line = format!("{} {}", format_date(&event.created_at), event.event_type.as_str());
    match (&event.old_value, &event.new_value) {
        (Some(old), Some(new)) => {
            let _ = write!(line, ": {old} -> {new}");
        }
        (None, Some(new)) => {
            let _ = write!(line, ": {new}");
        }
        (Some(old), None) => {
            let _ = write!(line, ": {old} -> (none)");
        }
        (None, None) => {}
    }
    if let Some(comment) = &event.comment {
        let _ = write!(line, " ({comment})");
    }
    line
}

#[must_use]
pub fn format_view_line(view: &SavedView) -> String {
    let scope = if view.is_team_view { "team" } else { "personal" };
    format!(
        "{} {} [{scope}] {}",
        short_id(&view.id),
        view.name,
        view.query_string
    )
}

#[must_use]
pub fn format_component_line(component: &Component) -> String {
    let mut line = format!("{} {}", short_id(&component.id), component.name);
    if let Some(team_id) = &component.team_id {
        let _ = write!(line, " [team {}]", short_id(team_id));
    }
    if !component.description.is_empty() {
        let _ = write!(line, " - {}", component.description);
    }
    line
}

#[must_use]
pub fn format_team_line(team: &Team) -> String {
    let mut line = format!(
        "{} {} (lead {})",
        short_id(&team.id),
        team.name,
        short_id(&team.lead_id)
    );
    if !team.description.is_empty() {
        let _ = write!(line, " - {}", team.description);
    }
    line
}

#[must_use]
pub fn format_target(target: &SlaTarget) -> String {
    format!(
        "{}/{}: {}",
        target.priority, target.severity, target.description
    )
}

#[must_use]
pub fn format_risk_report(report: &RiskReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "SLA risk (next {}h): {} at risk, {} breached",
        report.threshold_hours, report.at_risk, report.breached
    );
    for entry in &report.entries {
        let marker = if entry.is_breached() { "BREACHED" } else { "at risk" };
        let _ = writeln!(
            out,
            "  {} [{}/{}] {:>5}h {marker:<8} {}",
            short_id(&entry.issue_id),
            entry.priority,
            entry.severity,
            entry.hours_remaining,
            entry.title
        );
    }
    out
}

#[must_use]
pub fn format_stats_report(report: &StatsReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "SLA compliance {} .. {} ({} issues scanned)",
        format_date(&report.start),
        format_date(&report.end),
        report.issues_scanned
    );
    let _ = writeln!(
        out,
        "  Overall: {:.1}% ({} met, {} missed of {})",
        stats.compliance_percentage, stats.met, stats.missed, stats.total
    );
    for (title, buckets) in [("By priority", &stats.by_priority), ("By severity", &stats.by_severity)] {
        if buckets.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {title}:");
        for (key, bucket) in buckets {
            let _ = writeln!(
                out,
                "    {key:<4} {:>6.1}% ({}/{})",
                bucket.compliance_percentage, bucket.met, bucket.total
            );
        }
    }
    out
}
