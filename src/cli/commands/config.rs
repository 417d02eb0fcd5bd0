//! Configuration command.
//!
//! Shows the merged configuration with the layer each value came from.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::ConfigArgs;
use crate::cli::commands::print_json;
use crate::config::{
    CliOverrides, ConfigLayer, KNOWN_KEYS, default_config_layer, discover_dir, load_project_config,
    load_user_config,
};
use crate::error::Result;
use crate::format::ConfigEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigSource {
    Default,
    User,
    Project,
    Environment,
    Cli,
}

impl ConfigSource {
    const fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::User => "user config",
            Self::Project => ".bugtrack/config",
            Self::Environment => "environment",
            Self::Cli => "cli",
        }
    }
}

/// Execute the config command. Works outside a workspace.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed.
pub fn execute(args: &ConfigArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let dir = discover_dir(Some(Path::new("."))).ok();
    debug!(dir = ?dir, "Resolving config");

    if args.list {
        return list_known(json);
    }
    if args.path {
        return show_paths(dir.as_deref(), json);
    }

    let layers = [
        (ConfigSource::Default, default_config_layer()),
        (ConfigSource::User, load_user_config()?),
        (
            ConfigSource::Project,
            dir.as_deref()
                .map(load_project_config)
                .transpose()?
                .unwrap_or_default(),
        ),
        (ConfigSource::Environment, ConfigLayer::from_env()),
        (ConfigSource::Cli, cli.as_layer()),
    ];
    let entries = resolve_entries(&layers);

    if let Some(key) = &args.get {
        let entry = entries.into_iter().find(|entry| entry.key == normalize(key));
        if json {
            return print_json(&entry);
        }
        match entry {
            Some(entry) => println!("{}", entry.value),
            None => println!("{key} is not set"),
        }
        return Ok(());
    }

    if json {
        return print_json(&entries);
    }
    for entry in &entries {
        println!("{} = {}  ({})", entry.key, entry.value, entry.source);
    }
    Ok(())
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

/// Winning value and source per key, sorted by key.
fn resolve_entries(layers: &[(ConfigSource, ConfigLayer)]) -> Vec<ConfigEntry> {
    let mut winners: BTreeMap<String, (String, ConfigSource)> = BTreeMap::new();
    for (source, layer) in layers {
        for (key, value) in layer.sorted() {
            winners.insert(key.to_string(), (value.to_string(), *source));
        }
    }
    winners
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry {
            key,
            value,
            source: source.label(),
        })
        .collect()
}

fn list_known(json: bool) -> Result<()> {
    if json {
        let map: BTreeMap<&str, &str> = KNOWN_KEYS.iter().copied().collect();
        return print_json(&map);
    }
    for (key, description) in KNOWN_KEYS {
        println!("{key:<22} {description}");
    }
    Ok(())
}

fn user_config_path() -> Option<PathBuf> {
    env::var("HOME").ok().map(|home| {
        Path::new(&home)
            .join(".config")
            .join("bugtrack")
            .join("config.yaml")
    })
}

fn show_paths(dir: Option<&Path>, json: bool) -> Result<()> {
    let user = user_config_path().map(|p| p.display().to_string());
    let project = dir.map(|d| d.join("config.yaml").display().to_string());

    if json {
        return print_json(&serde_json::json!({ "user": user, "project": project }));
    }
    println!("user:    {}", user.as_deref().unwrap_or("(no HOME)"));
    println!("project: {}", project.as_deref().unwrap_or("(not in a workspace)"));
    Ok(())
}
