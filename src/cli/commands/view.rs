//! Saved view commands.

use tracing::info;
use uuid::Uuid;

use crate::cli::commands::{CommandContext, join_words, parse_id, print_json, print_search_result};
use crate::cli::{ViewCommands, ViewSaveArgs};
use crate::config::CliOverrides;
use crate::error::{Result, TrackerError};
use crate::format::{format_view_line, short_id};
use crate::model::SavedView;
use crate::query::search;

/// Execute a view subcommand.
///
/// # Errors
///
/// Returns `MissingIdentity` for commands that act on the caller's views,
/// `ViewNotFound`, a validation error, or a database error.
pub fn execute(command: &ViewCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;
    match command {
        ViewCommands::Save(args) => save(args, &mut ctx, json),
        ViewCommands::List => list(&ctx, json),
        ViewCommands::Show { id } => {
            let view = require_view(&ctx, id)?;
            if json {
                return print_json(&view);
            }
            println!("{}", format_view_line(&view));
            Ok(())
        }
        ViewCommands::Run { id, page } => {
            let view = require_view(&ctx, id)?;
            let pagination = ctx.pagination(page.limit, page.page_token.clone());
            let result = search(&ctx.storage, &view.query_string, &ctx.identity, &pagination)?;
            print_search_result(&result, json)
        }
        ViewCommands::Delete { id } => delete(&mut ctx, id, json),
    }
}

fn save(args: &ViewSaveArgs, ctx: &mut CommandContext, json: bool) -> Result<()> {
    let owner_id = ctx.identity.require()?;
    let team_id = args
        .team
        .as_deref()
        .map(|value| parse_id("team", value))
        .transpose()?;

    let view = SavedView {
        id: Uuid::new_v4(),
        name: args.name.trim().to_string(),
        owner_id,
        is_team_view: team_id.is_some(),
        team_id,
        query_string: join_words(&args.query),
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    ctx.storage.create_view(&view)?;
    info!(view_id = %view.id, name = %view.name, "Saved view");

    if json {
        return print_json(&view);
    }
    println!("Saved view {} ({}): {}", view.name, short_id(&view.id), view.query_string);
    Ok(())
}

fn list(ctx: &CommandContext, json: bool) -> Result<()> {
    let owner_id = ctx.identity.require()?;
    let views = ctx.storage.list_views(&owner_id)?;

    if json {
        return print_json(&views);
    }
    if views.is_empty() {
        println!("No saved views.");
        return Ok(());
    }
    for view in &views {
        println!("{}", format_view_line(view));
    }
    Ok(())
}

fn delete(ctx: &mut CommandContext, id: &str, json: bool) -> Result<()> {
    let owner_id = ctx.identity.require()?;
    let view_id = parse_id("view", id)?;
    if !ctx.storage.delete_view(&view_id, &owner_id)? {
        return Err(TrackerError::ViewNotFound { id: id.to_string() });
    }

    if json {
        return print_json(&serde_json::json!({ "deleted": view_id }));
    }
    println!("Deleted view {}", short_id(&view_id));
    Ok(())
}

fn require_view(ctx: &CommandContext, id: &str) -> Result<SavedView> {
    let view_id = parse_id("view", id)?;
    ctx.storage
        .get_view(&view_id)?
        .ok_or_else(|| TrackerError::ViewNotFound { id: id.to_string() })
}
