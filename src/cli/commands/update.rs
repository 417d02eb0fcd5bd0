//! Update command implementation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cli::UpdateArgs;
use crate::cli::commands::{CommandContext, parse_id, print_json};
use crate::config::CliOverrides;
use crate::error::{Result, TrackerError};
use crate::format::short_id;
use crate::model::{Identity, Issue, Priority, Severity, Status};
use crate::storage::IssueUpdate;
use crate::util::time::parse_cli_timestamp;
use crate::validation::LabelValidator;

/// Actor recorded on events when no user was given.
const ANONYMOUS_ACTOR: &str = "anonymous";

/// Execute the update command.
///
/// # Errors
///
/// Returns an error for bad arguments, a missing issue, a validation
/// failure, or a database error.
pub fn execute(args: &UpdateArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;
    let issue_id = parse_id("issue", &args.id)?;
    let update = build_update(args, ctx.now)?;
    if let Some(component_id) = &update.component_id {
        ctx.storage.require_component(component_id)?;
    }
    if update.is_empty() {
        return Err(TrackerError::validation("update", "no changes given"));
    }

    let actor = actor_name(&ctx.identity);
    let before = ctx.storage.require_issue(&issue_id)?;
    let after = ctx.storage.update_issue(&issue_id, &update, &actor, ctx.now)?;

    if json {
        return print_json(&after);
    }
    print_update_summary(&before, &after);
    Ok(())
}

fn actor_name(identity: &Identity) -> String {
    identity
        .user_id
        .map_or_else(|| ANONYMOUS_ACTOR.to_string(), |id| id.to_string())
}

fn print_update_summary(before: &Issue, after: &Issue) {
    println!("Updated {}: {}", short_id(&after.id), after.title);
    if before.status != after.status {
        println!("  status: {} -> {}", before.status, after.status);
    }
    if before.priority != after.priority {
        println!("  priority: {} -> {}", before.priority, after.priority);
    }
    if before.severity != after.severity {
        println!("  severity: {} -> {}", before.severity, after.severity);
    }
    if before.assignee_id != after.assignee_id {
        println!(
            "  assignee: {}",
            after
                .assignee_id
                .map_or_else(|| "(none)".to_string(), |id| id.to_string())
        );
    }
    if before.labels != after.labels {
        println!("  labels: {}", after.labels.join(", "));
    }
}

fn build_update(args: &UpdateArgs, now: DateTime<Utc>) -> Result<IssueUpdate> {
    for label in args.add_label.iter().chain(&args.remove_label) {
        LabelValidator::validate(label)
            .map_err(|e| TrackerError::from_validation_errors(vec![e]))?;
    }

    Ok(IssueUpdate {
        title: args.title.clone(),
        description: args.description.clone(),
        reproduce_steps: optional_string_field(args.steps.as_deref()),
        component_id: args
            .component
            .as_deref()
            .map(|value| parse_id("component", value))
            .transpose()?,
        status: args.status.as_deref().map(Status::from_str).transpose()?,
        priority: args.priority.as_deref().map(Priority::from_str).transpose()?,
        severity: args.severity.as_deref().map(Severity::from_str).transpose()?,
        assignee_id: optional_id_field("assignee", args.assignee.as_deref())?,
        due_date: optional_date_field(args.due.as_deref(), now)?,
        add_labels: args.add_label.clone(),
        remove_labels: args.remove_label.clone(),
    })
}

/// `None` leaves the field alone; an empty string clears it.
fn optional_string_field(value: Option<&str>) -> Option<Option<String>> {
    value.map(|v| (!v.is_empty()).then(|| v.to_string()))
}

fn optional_id_field(field: &str, value: Option<&str>) -> Result<Option<Option<Uuid>>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(Some(None)),
        Some(v) => parse_id(field, v).map(|id| Some(Some(id))),
    }
}

fn optional_date_field(
    value: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<Option<DateTime<Utc>>>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(Some(None)),
        Some(v) => parse_cli_timestamp(v, "due", now).map(|ts| Some(Some(ts))),
    }
}
