//! History command: the audit trail of one issue.

use crate::cli::HistoryArgs;
use crate::cli::commands::{CommandContext, parse_id, print_json};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{format_event, short_id};

/// Execute the history command. Events are printed newest first.
///
/// # Errors
///
/// Returns `InvalidUuid`, `IssueNotFound`, or a database error.
pub fn execute(args: &HistoryArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let issue_id = parse_id("issue", &args.id)?;
    ctx.storage.require_issue(&issue_id)?;
    let events = ctx.storage.get_events(&issue_id, args.limit)?;

    if json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No history for {}.", short_id(&issue_id));
        return Ok(());
    }
    for event in &events {
        println!("{}", format_event(event));
    }
    Ok(())
}
