//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Issue tracker with a filter query language and SLA tracking (`SQLite`)
#[derive(Parser, Debug)]
#[command(name = "bt", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: .bugtrack/bugtrack.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Caller identity (user UUID)
    #[arg(long, global = true, env = "BT_USER")]
    pub user: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Append JSON logs to this file
    #[arg(long, global = true, env = "BT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a bugtrack workspace
    Init {
        /// Recreate the database if it exists
        #[arg(long)]
        force: bool,
    },

    /// Create a new issue (due date is set from the SLA target)
    Create(CreateArgs),

    /// Show issue details
    Show {
        /// Issue ID
        id: String,
    },

    /// Update an issue
    Update(UpdateArgs),

    /// List issues matching a filter (default: is:open)
    List(ListArgs),

    /// Search issues (filter required)
    Search(SearchArgs),

    /// Manage comments
    #[command(alias = "comment")]
    Comments {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Manage saved views
    #[command(alias = "views")]
    View {
        #[command(subcommand)]
        command: ViewCommands,
    },

    /// Register and list components
    #[command(alias = "components")]
    Component {
        #[command(subcommand)]
        command: ComponentCommands,
    },

    /// Register and list teams
    #[command(alias = "teams")]
    Team {
        #[command(subcommand)]
        command: TeamCommands,
    },

    /// Show the audit trail of an issue
    History(HistoryArgs),

    /// SLA targets, risk and compliance
    Sla {
        #[command(subcommand)]
        command: SlaCommands,
    },

    /// Show resolved configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Issue title
    pub title: String,

    /// Component ID
    #[arg(long, short = 'c')]
    pub component: String,

    /// Description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Steps to reproduce
    #[arg(long)]
    pub steps: Option<String>,

    /// Priority (P0-P4)
    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    /// Severity (S0-S3)
    #[arg(long, short = 's')]
    pub severity: Option<String>,

    /// Assignee user ID
    #[arg(long, short = 'a')]
    pub assignee: Option<String>,

    /// Labels (comma-separated)
    #[arg(long, short = 'l', value_delimiter = ',')]
    pub labels: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Issue ID
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, visible_alias = "body")]
    pub description: Option<String>,

    /// Steps to reproduce (empty string clears)
    #[arg(long)]
    pub steps: Option<String>,

    /// Component ID
    #[arg(long)]
    pub component: Option<String>,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    #[arg(long, short = 's')]
    pub severity: Option<String>,

    /// Assignee user ID (empty string clears)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Due date: RFC3339, YYYY-MM-DD or +N[m|h|d|w] (empty string clears)
    #[arg(long)]
    pub due: Option<String>,

    /// Add label(s)
    #[arg(long, value_delimiter = ',')]
    pub add_label: Vec<String>,

    /// Remove label(s)
    #[arg(long, value_delimiter = ',')]
    pub remove_label: Vec<String>,
}

/// Paging flags shared by list-like commands.
#[derive(Args, Debug, Default, Clone)]
pub struct PageArgs {
    /// Page size (default: page-size config, 50)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Page token from a previous response
    #[arg(long)]
    pub page_token: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Filter words, e.g. `priority:P0 assignee:me crash`
    pub filter: Vec<String>,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Filter words
    pub query: Vec<String>,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Add a comment (requires --user)
    Add(CommentAddArgs),
    /// List comments, oldest first
    List {
        /// Issue ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct CommentAddArgs {
    /// Issue ID
    pub id: String,

    /// Comment text
    pub text: Vec<String>,

    /// Read comment text from file
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ViewCommands {
    /// Save a filter as a named view (requires --user)
    Save(ViewSaveArgs),
    /// List your views and team views
    List,
    /// Show a view
    Show {
        /// View ID
        id: String,
    },
    /// Run a view's filter
    Run {
        /// View ID
        id: String,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Delete one of your views
    Delete {
        /// View ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct ViewSaveArgs {
    /// View name
    pub name: String,

    /// Filter words
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Share with a team
    #[arg(long)]
    pub team: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ComponentCommands {
    /// Register a component (owner defaults to --user)
    Create(ComponentCreateArgs),
    /// List components by name
    List {
        /// Only components owned by this team
        #[arg(long)]
        team: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct ComponentCreateArgs {
    /// Component name (unique)
    pub name: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Owning team ID
    #[arg(long)]
    pub team: Option<String>,

    /// Owner user ID
    #[arg(long)]
    pub owner: Option<String>,

    /// Register under a fixed ID instead of a fresh one
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Register a team (lead defaults to --user)
    Create(TeamCreateArgs),
    /// List teams by name
    List,
}

#[derive(Args, Debug)]
pub struct TeamCreateArgs {
    /// Team name (unique)
    pub name: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Lead user ID
    #[arg(long)]
    pub lead: Option<String>,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Issue ID
    pub id: String,

    /// Maximum events (0 = all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

#[derive(Subcommand, Debug)]
pub enum SlaCommands {
    /// Compute the SLA target for a priority and severity
    Target {
        #[arg(long, short = 'p', default_value = "P2")]
        priority: String,

        #[arg(long, short = 's', default_value = "S2")]
        severity: String,
    },
    /// Open issues due within the threshold, including breached ones
    Risk(RiskArgs),
    /// Compliance for issues created in a window
    Stats(StatsArgs),
}

#[derive(Args, Debug, Default)]
pub struct RiskArgs {
    /// Team ID
    #[arg(long)]
    pub team: Option<String>,

    /// Include closed issues
    #[arg(long)]
    pub include_closed: bool,

    /// Hours ahead of now (default: risk-threshold-hours config, 4)
    #[arg(long)]
    pub threshold: Option<i64>,

    /// Maximum issues scanned
    #[arg(long, default_value_t = crate::sla::report::DEFAULT_RISK_LIMIT)]
    pub limit: usize,
}

#[derive(Args, Debug, Default)]
pub struct StatsArgs {
    /// Component ID
    #[arg(long)]
    pub component: Option<String>,

    /// Team ID
    #[arg(long)]
    pub team: Option<String>,

    /// Window start: RFC3339, YYYY-MM-DD or -N[m|h|d|w] (default: one month ago)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end (default: now)
    #[arg(long)]
    pub end: Option<String>,

    /// Maximum issues scanned
    #[arg(long, default_value_t = crate::sla::report::DEFAULT_STATS_LIMIT)]
    pub limit: usize,
}

/// Arguments for the config command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// List known config keys with descriptions
    #[arg(long, short = 'l')]
    pub list: bool,

    /// Get a specific config value by key
    #[arg(long, short = 'g', value_name = "KEY")]
    pub get: Option<String>,

    /// Show config file paths
    #[arg(long, short = 'p')]
    pub path: bool,
}
