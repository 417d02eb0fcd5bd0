//! Comments command implementation.

use std::fs;

use crate::cli::commands::{CommandContext, parse_id, print_json};
use crate::cli::{CommentAddArgs, CommentCommands};
use crate::config::CliOverrides;
use crate::error::{Result, TrackerError};
use crate::format::{format_comment, short_id};

/// Execute the comments command.
///
/// # Errors
///
/// Returns an error if database operations fail or if inputs are invalid.
pub fn execute(command: &CommentCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;
    match command {
        CommentCommands::Add(args) => add_comment(args, &mut ctx, json),
        CommentCommands::List { id } => list_comments(id, &ctx, json),
    }
}

fn add_comment(args: &CommentAddArgs, ctx: &mut CommandContext, json: bool) -> Result<()> {
    let author_id = ctx.identity.require()?;
    let issue_id = parse_id("issue", &args.id)?;
    let text = read_comment_text(args)?;

    let comment = ctx.storage.add_comment(&issue_id, author_id, &text, ctx.now)?;

    if json {
        return print_json(&comment);
    }
    println!("Comment added to {}", short_id(&issue_id));
    Ok(())
}

fn list_comments(id: &str, ctx: &CommandContext, json: bool) -> Result<()> {
    let issue_id = parse_id("issue", id)?;
    ctx.storage.require_issue(&issue_id)?;
    let comments = ctx.storage.get_comments(&issue_id)?;

    if json {
        return print_json(&comments);
    }
    if comments.is_empty() {
        println!("No comments for {}.", short_id(&issue_id));
        return Ok(());
    }
    for comment in &comments {
        println!("{}", format_comment(comment));
    }
    Ok(())
}

fn read_comment_text(args: &CommentAddArgs) -> Result<String> {
    if let Some(path) = &args.file {
        return Ok(fs::read_to_string(path)?);
    }
    if !args.text.is_empty() {
        return Ok(args.text.join(" "));
    }
    Err(TrackerError::validation("content", "comment text required"))
}
