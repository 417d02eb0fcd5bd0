//! Command implementations.
//!
//! Each command takes its parsed args, the `--json` flag and the CLI config
//! overrides, and prints its result to stdout.

pub mod comments;
pub mod component;
pub mod config;
pub mod create;
pub mod history;
pub mod init;
pub mod list;
pub mod search;
pub mod show;
pub mod sla;
pub mod team;
pub mod update;
pub mod view;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{self as cfg, CliOverrides, ConfigLayer};
use crate::error::{Result, TrackerError};
use crate::format::{format_issue_line, terminal_width};
use crate::model::Identity;
use crate::query::{Pagination, SearchResult};
use crate::storage::SqliteStorage;

/// Everything a command needs after workspace discovery.
pub struct CommandContext {
    pub dir: PathBuf,
    pub db_path: PathBuf,
    pub storage: SqliteStorage,
    pub config: ConfigLayer,
    pub identity: Identity,
    /// Read once per command.
    pub now: DateTime<Utc>,
}

impl CommandContext {
    /// Discover the workspace, load config and open the database.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized`, a config error, an invalid `user`, or a
    /// database error.
    pub fn open(cli: &CliOverrides) -> Result<Self> {
        let dir = cfg::discover_dir(Some(Path::new(".")))?;
        let config = cfg::load_config(Some(&dir), cli)?;
        let identity = cfg::identity_from_layer(&config)?;
        let (storage, db_path) = cfg::open_storage(&dir, &config)?;
        Ok(Self {
            dir,
            db_path,
            storage,
            config,
            identity,
            now: Utc::now(),
        })
    }

    /// Pagination from flags, falling back to the `page-size` config.
    #[must_use]
    pub fn pagination(&self, limit: Option<usize>, page_token: Option<String>) -> Pagination {
        let size = limit
            .filter(|size| *size > 0)
            .unwrap_or_else(|| cfg::page_size_from_layer(&self.config));
        Pagination::new(size, page_token)
    }
}

/// Parse a UUID argument naming the field on failure.
pub(crate) fn parse_id(field: &str, value: &str) -> Result<Uuid> {
    TrackerError::parse_uuid(field, value)
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a search result as JSON or one line per issue plus a footer.
pub(crate) fn print_search_result(result: &SearchResult, json: bool) -> Result<()> {
    if json {
        return print_json(result);
    }

    if result.issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    let width = terminal_width();
    for issue in &result.issues {
        println!("{}", format_issue_line(issue, Some(width)));
    }
    match &result.next_page_token {
        Some(token) => println!(
            "\n{} of {} shown. Next page: --page-token {token}",
            result.issues.len(),
            result.total
        ),
        None => println!("\n{} issue(s)", result.total),
    }
    Ok(())
}

/// Join positional filter words back into one filter string.
pub(crate) fn join_words(words: &[String]) -> String {
    words.join(" ")
}
