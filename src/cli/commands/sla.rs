//! SLA commands: target, risk and stats.

use std::str::FromStr;

use chrono::Utc;

use crate::cli::commands::{CommandContext, print_json};
use crate::cli::{RiskArgs, SlaCommands, StatsArgs};
use crate::config::{self, CliOverrides};
use crate::error::Result;
use crate::format::{format_risk_report, format_stats_report, format_target};
use crate::model::{Priority, Severity};
use crate::sla::{RiskRequest, StatsRequest, calculate_target, risk_report, stats_report};
use crate::util::time::parse_cli_timestamp;

/// Execute an SLA subcommand.
///
/// # Errors
///
/// Returns a parse or validation error for bad arguments, or the query error.
pub fn execute(command: &SlaCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    match command {
        SlaCommands::Target { priority, severity } => target(priority, severity, json),
        SlaCommands::Risk(args) => risk(args, json, cli),
        SlaCommands::Stats(args) => stats(args, json, cli),
    }
}

/// Needs no workspace.
fn target(priority: &str, severity: &str, json: bool) -> Result<()> {
    let priority = Priority::from_str(priority)?;
    let severity = Severity::from_str(severity)?;
    let target = calculate_target(&priority, &severity, Utc::now());

    if json {
        return print_json(&target);
    }
    println!("{}", format_target(&target));
    Ok(())
}

fn risk(args: &RiskArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let request = RiskRequest {
        team: args.team.clone(),
        include_closed: args.include_closed,
        threshold_hours: args
            .threshold
            .unwrap_or_else(|| config::risk_threshold_from_layer(&ctx.config)),
        limit: args.limit,
    };
    let report = risk_report(&ctx.storage, ctx.now, &request)?;

    if json {
        return print_json(&report);
    }
    print!("{}", format_risk_report(&report));
    Ok(())
}

fn stats(args: &StatsArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let request = StatsRequest {
        component_id: args.component.clone(),
        team: args.team.clone(),
        start: args
            .start
            .as_deref()
            .map(|value| parse_cli_timestamp(value, "start", ctx.now))
            .transpose()?,
        end: args
            .end
            .as_deref()
            .map(|value| parse_cli_timestamp(value, "end", ctx.now))
            .transpose()?,
        limit: args.limit,
    };
    let report = stats_report(&ctx.storage, ctx.now, &request)?;

    if json {
        return print_json(&report);
    }
    print!("{}", format_stats_report(&report));
    Ok(())
}
