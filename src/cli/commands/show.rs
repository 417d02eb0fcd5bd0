//! Show command implementation.

use crate::cli::commands::{CommandContext, parse_id, print_json};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{IssueDetails, format_issue_details};

/// Execute the show command.
///
/// # Errors
///
/// Returns `InvalidUuid`, `IssueNotFound`, or a database error.
pub fn execute(id: &str, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let issue_id = parse_id("issue", id)?;
    let issue = ctx.storage.require_issue(&issue_id)?;
    let comments = ctx.storage.get_comments(&issue_id)?;

    if json {
        return print_json(&IssueDetails { issue, comments });
    }
    print!("{}", format_issue_details(&issue, &comments));
    Ok(())
}
