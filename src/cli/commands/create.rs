//! Create command implementation.

use std::str::FromStr;

use tracing::info;

use crate::cli::CreateArgs;
use crate::cli::commands::{CommandContext, parse_id, print_json};
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::format::{CreatedIssue, format_target, short_id};
use crate::model::{Issue, Priority, Severity};
use crate::sla::calculate_target;

/// Execute the create command.
///
/// The due date comes from the SLA target, computed with the same `now` as
/// `created_at`.
///
/// # Errors
///
/// Returns `MissingIdentity` without `--user`, a parse error for bad
/// IDs/priority/severity, `ComponentNotFound` for an unregistered component,
/// a validation error, or a database error.
pub fn execute(args: &CreateArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;
    let reporter_id = ctx.identity.require()?;
    let component_id = parse_id("component", &args.component)?;
    ctx.storage.require_component(&component_id)?;

    let priority = match &args.priority {
        Some(value) => Priority::from_str(value)?,
        None => config::default_priority_from_layer(&ctx.config)?,
    };
    let severity = match &args.severity {
        Some(value) => Severity::from_str(value)?,
        None => config::default_severity_from_layer(&ctx.config)?,
    };

    let mut issue = Issue::new(&args.title, component_id, reporter_id, ctx.now);
    issue.description = args.description.clone().unwrap_or_default();
    issue.reproduce_steps.clone_from(&args.steps);
    issue.assignee_id = args
        .assignee
        .as_deref()
        .map(|value| parse_id("assignee", value))
        .transpose()?;
    issue.labels = args
        .labels
        .iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect();
    issue.labels.dedup();

    let target = calculate_target(&priority, &severity, ctx.now);
    issue.priority = priority;
    issue.severity = severity;
    issue.due_date = Some(target.target_date);

    ctx.storage.create_issue(&issue, &reporter_id.to_string())?;
    info!(
        issue_id = %issue.id,
        priority = %issue.priority,
        severity = %issue.severity,
        due = %target.target_date,
        "Created issue"
    );

    if json {
        return print_json(&CreatedIssue { issue, sla: target });
    }
    println!("Created {} ({}): {}", short_id(&issue.id), issue.id, issue.title);
    println!("  {}", format_target(&target));
    Ok(())
}
