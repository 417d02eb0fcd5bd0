use bugtrack::cli::commands;
use bugtrack::cli::{Cli, Commands};
use bugtrack::config;
use bugtrack::logging::init_logging;
use bugtrack::{StructuredError, TrackerError};
use clap::Parser;
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = build_cli_overrides(&cli);
    let json = cli.json;

    let result = match &cli.command {
        Commands::Init { force } => commands::init::execute(*force, json, None),
        Commands::Create(args) => commands::create::execute(args, json, &overrides),
        Commands::Show { id } => commands::show::execute(id, json, &overrides),
        Commands::Update(args) => commands::update::execute(args, json, &overrides),
        Commands::List(args) => commands::list::execute(args, json, &overrides),
        Commands::Search(args) => commands::search::execute(args, json, &overrides),
        Commands::Comments { command } => commands::comments::execute(command, json, &overrides),
        Commands::View { command } => commands::view::execute(command, json, &overrides),
        Commands::Component { command } => commands::component::execute(command, json, &overrides),
        Commands::Team { command } => commands::team::execute(command, json, &overrides),
        Commands::History(args) => commands::history::execute(args, json, &overrides),
        Commands::Sla { command } => commands::sla::execute(command, json, &overrides),
        Commands::Config(args) => commands::config::execute(args, json, &overrides),
    };

    if let Err(e) = result {
        handle_error(&e, json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs a human-readable error with optional color.
fn handle_error(err: &TrackerError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    if json_mode || !io::stdout().is_terminal() {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        db: cli.db.clone(),
        user: cli.user.clone(),
        lock_timeout: cli.lock_timeout,
    }
}
