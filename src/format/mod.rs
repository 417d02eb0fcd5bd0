//! Output formatting for `bugtrack`.
//!
//! Human-readable text goes to stdout by default; `--json` switches every
//! command to machine-parseable JSON with diagnostics on stderr.

mod output;
mod text;

pub use output::{ConfigEntry, CreatedIssue, IssueDetails};
pub use text::{
    format_comment, format_component_line, format_event, format_issue_details, format_issue_line, format_risk_report,
    format_stats_report, format_status_icon, format_target, format_team_line, format_view_line, short_id,
    terminal_width, truncate_title,
};
