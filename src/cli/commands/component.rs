//! Component registry commands.

use tracing::info;
use uuid::Uuid;

use crate::cli::commands::{CommandContext, parse_id, print_json};
use crate::cli::{ComponentCommands, ComponentCreateArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{format_component_line, short_id};
use crate::model::Component;

/// Execute a component subcommand.
///
/// # Errors
///
/// Returns `MissingIdentity` when creating without an owner, `TeamNotFound`,
/// a validation error, or a database error.
pub fn execute(command: &ComponentCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;
    match command {
        ComponentCommands::Create(args) => create(args, &mut ctx, json),
        ComponentCommands::List { team } => list(&ctx, team.as_deref(), json),
    }
}

fn create(args: &ComponentCreateArgs, ctx: &mut CommandContext, json: bool) -> Result<()> {
    let owner_id = match &args.owner {
        Some(value) => parse_id("owner", value)?,
        None => ctx.identity.require()?,
    };
    let id = match &args.id {
        Some(value) => parse_id("component", value)?,
        None => Uuid::new_v4(),
    };
    let team_id = args
        .team
        .as_deref()
        .map(|value| parse_id("team", value))
        .transpose()?;

    let component = Component {
        id,
        name: args.name.trim().to_string(),
        description: args.description.clone().unwrap_or_default(),
        owner_id,
        team_id,
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    ctx.storage.create_component(&component)?;
    info!(component_id = %component.id, "Created component");

    if json {
        return print_json(&component);
    }
    println!(
        "Created component {} ({}): {}",
        short_id(&component.id),
        component.id,
        component.name
    );
    Ok(())
}

fn list(ctx: &CommandContext, team: Option<&str>, json: bool) -> Result<()> {
    let team_id = team.map(|value| parse_id("team", value)).transpose()?;
    if let Some(team_id) = &team_id {
        ctx.storage.require_team(team_id)?;
    }
    let components = ctx.storage.list_components(team_id.as_ref())?;

    if json {
        return print_json(&components);
    }
    if components.is_empty() {
        println!("No components.");
        return Ok(());
    }
    for component in &components {
        println!("{}", format_component_line(component));
    }
    Ok(())
}
