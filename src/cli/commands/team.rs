//! Team registry commands.

use tracing::info;
use uuid::Uuid;

use crate::cli::commands::{CommandContext, parse_id, print_json};
use crate::cli::{TeamCommands, TeamCreateArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{format_team_line, short_id};
use crate::model::Team;

/// Execute a team subcommand.
///
/// # Errors
///
/// Returns `MissingIdentity` when creating without a lead, a validation
/// error, or a database error.
pub fn execute(command: &TeamCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;
    match command {
        TeamCommands::Create(args) => create(args, &mut ctx, json),
        TeamCommands::List => {
            let teams = ctx.storage.list_teams()?;
            if json {
                return print_json(&teams);
            }
            if teams.is_empty() {
                println!("No teams.");
            }
            for team in &teams {
                println!("{}", format_team_line(team));
            }
            Ok(())
        }
    }
}

fn create(args: &TeamCreateArgs, ctx: &mut CommandContext, json: bool) -> Result<()> {
    let lead_id = match &args.lead {
        Some(value) => parse_id("lead", value)?,
        None => ctx.identity.require()?,
    };
    let team = Team {
        id: Uuid::new_v4(),
        name: args.name.trim().to_string(),
        description: args.description.clone().unwrap_or_default(),
        lead_id,
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    ctx.storage.create_team(&team)?;
    info!(team_id = %team.id, "Created team");

    if json {
        return print_json(&team);
    }
    println!("Created team {} ({}): {}", short_id(&team.id), team.id, team.name);
    Ok(())
}
