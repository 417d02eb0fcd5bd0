//! Configuration management for `bugtrack`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`BT_*`)
//! 3. Project config (.bugtrack/config.yaml)
//! 4. User config (~/.config/bugtrack/config.yaml)
//! 5. Defaults

use crate::error::{Result, TrackerError};
use crate::model::{Identity, Priority, Severity};
use crate::query::DEFAULT_PAGE_SIZE;
use crate::sla::report::DEFAULT_RISK_THRESHOLD_HOURS;
use crate::storage::SqliteStorage;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Workspace directory name.
pub const DIR_NAME: &str = ".bugtrack";
/// Database filename inside the workspace directory.
pub const DEFAULT_DB_FILENAME: &str = "bugtrack.db";
/// Busy timeout used when none is configured.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

/// Keys understood by the loader, with their documented meaning.
pub const KNOWN_KEYS: &[(&str, &str)] = &[
    ("db", "Database path (default: .bugtrack/bugtrack.db)"),
    ("lock-timeout", "SQLite busy timeout in milliseconds"),
    ("user", "Caller identity (UUID)"),
    ("page-size", "Default page size for list and search"),
    ("risk-threshold-hours", "Hours ahead of now counted as at risk"),
    ("default-priority", "Priority for new issues"),
    ("default-severity", "Severity for new issues"),
];

/// Discover the active `.bugtrack` directory.
///
/// Honors `BT_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns `NotInitialized` if no directory is found, or an I/O error if the
/// CWD cannot be read.
pub fn discover_dir(start: Option<&Path>) -> Result<PathBuf> {
    discover_dir_with_env(start, env::var_os("BT_DIR").map(PathBuf::from).as_deref())
}

fn discover_dir_with_env(start: Option<&Path>, env_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !current.pop() {
            break;
        }
    }

    Err(TrackerError::NotInitialized)
}

/// One source of configuration values, keyed by normalized name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);

        let mut layer = Self::default();
        for (key, value) in flat {
            layer.insert(&key, value);
        }
        debug!(path = %path.display(), keys = layer.values.len(), "Loaded config file");
        Ok(layer)
    }

    /// Build a layer from `BT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix("BT_") else {
                continue;
            };
            // BT_DIR locates the workspace; it is not a config value.
            if stripped == "DIR" {
                continue;
            }
            layer.insert(stripped, value);
        }
        layer
    }

    /// Insert under the normalized form of `key`.
    pub fn insert(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }

    /// Look up a non-blank value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&normalize_key(key))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Sorted view for display.
    #[must_use]
    pub fn sorted(&self) -> BTreeMap<&str, &str> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub user: Option<String>,
    pub lock_timeout: Option<u64>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            layer.insert("db", path.to_string_lossy().to_string());
        }
        if let Some(user) = &self.user {
            layer.insert("user", user.clone());
        }
        if let Some(lock_timeout) = self.lock_timeout {
            layer.insert("lock-timeout", lock_timeout.to_string());
        }

        layer
    }
}

/// Load project config (.bugtrack/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&dir.join("config.yaml"))
}

/// Load user config (~/.config/bugtrack/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("bugtrack")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.insert("page-size", DEFAULT_PAGE_SIZE.to_string());
    layer.insert(
        "risk-threshold-hours",
        DEFAULT_RISK_THRESHOLD_HOURS.to_string(),
    );
    layer.insert("default-priority", Priority::default().to_string());
    layer.insert("default-severity", Severity::default().to_string());
    layer.insert("lock-timeout", DEFAULT_LOCK_TIMEOUT_MS.to_string());
    layer
}

/// Load configuration with full precedence order.
///
/// `dir` is the workspace directory when one was discovered; without it the
/// project layer is skipped.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(dir: Option<&Path>, cli: &CliOverrides) -> Result<ConfigLayer> {
    let project = match dir {
        Some(dir) => load_project_config(dir)?,
        None => ConfigLayer::default(),
    };

    Ok(ConfigLayer::merge_layers(&[
        default_config_layer(),
        load_user_config()?,
        project,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]))
}

/// Resolve the database path: explicit `db` key, else `<dir>/bugtrack.db`.
#[must_use]
pub fn db_path_from_layer(layer: &ConfigLayer, dir: &Path) -> PathBuf {
    layer.get("db").map_or_else(
        || dir.join(DEFAULT_DB_FILENAME),
        |value| {
            let candidate = PathBuf::from(value);
            if candidate.is_absolute() {
                candidate
            } else {
                dir.parent().unwrap_or(dir).join(candidate)
            }
        },
    )
}

#[must_use]
pub fn lock_timeout_from_layer(layer: &ConfigLayer) -> u64 {
    layer
        .get("lock-timeout")
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_LOCK_TIMEOUT_MS)
}

/// Page size; non-numeric or zero values fall back to the default.
#[must_use]
pub fn page_size_from_layer(layer: &ConfigLayer) -> usize {
    layer
        .get("page-size")
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

#[must_use]
pub fn risk_threshold_from_layer(layer: &ConfigLayer) -> i64 {
    layer
        .get("risk-threshold-hours")
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|hours| *hours >= 0)
        .unwrap_or(DEFAULT_RISK_THRESHOLD_HOURS)
}

/// # Errors
///
/// Returns an error if the configured value is not a valid priority.
pub fn default_priority_from_layer(layer: &ConfigLayer) -> Result<Priority> {
    layer
        .get("default-priority")
        .map_or_else(|| Ok(Priority::default()), Priority::from_str)
}

/// # Errors
///
/// Returns an error if the configured value is not a valid severity.
pub fn default_severity_from_layer(layer: &ConfigLayer) -> Result<Severity> {
    layer
        .get("default-severity")
        .map_or_else(|| Ok(Severity::default()), Severity::from_str)
}

/// Resolve the caller identity. No `user` key means anonymous.
///
/// # Errors
///
/// Returns `InvalidUuid` if `user` is set but is not a UUID.
pub fn identity_from_layer(layer: &ConfigLayer) -> Result<Identity> {
    match layer.get("user") {
        Some(value) => TrackerError::parse_uuid("user", value).map(Identity::user),
        None => Ok(Identity::anonymous()),
    }
}

/// Open storage for a workspace using the merged config.
///
/// # Errors
///
/// Returns `DatabaseNotFound` when the database file is missing, or the
/// error raised while opening it.
pub fn open_storage(dir: &Path, layer: &ConfigLayer) -> Result<(SqliteStorage, PathBuf)> {
    let db_path = db_path_from_layer(layer, dir);
    if !db_path.exists() {
        return Err(TrackerError::DatabaseNotFound { path: db_path });
    }
    let storage =
        SqliteStorage::open_with_timeout(&db_path, Some(lock_timeout_from_layer(layer)))?;
    Ok((storage, db_path))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[test]
    fn test_discover_walks_up() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join(DIR_NAME);
        fs::create_dir_all(&dir).expect("create dir");
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("nested");

        let found = discover_dir_with_env(Some(&nested), None).expect("discover");
        assert_eq!(found, dir);
    }

    #[test]
    fn test_discover_env_override_wins() {
        let temp = TempDir::new().expect("tempdir");
        let other = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join(DIR_NAME)).expect("create dir");

        let found = discover_dir_with_env(Some(temp.path()), Some(other.path())).expect("discover");
        assert_eq!(found, other.path());
    }

    #[test]
    fn test_discover_not_initialized() {
        let temp = TempDir::new().expect("tempdir");
        let err = discover_dir_with_env(Some(temp.path()), None).unwrap_err();
        assert!(matches!(err, TrackerError::NotInitialized));
    }

    #[test]
    fn test_yaml_layer_flattens_and_normalizes() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.yaml");
        fs::write(&path, "page_size: 25\nsla:\n  hours: 3\nlabels: [a, b]\n").expect("write");

        let layer = ConfigLayer::from_yaml(&path).expect("yaml");
        assert_eq!(layer.get("page-size"), Some("25"));
        assert_eq!(layer.get("sla.hours"), Some("3"));
        assert_eq!(layer.get("labels"), Some("a,b"));
    }

    #[test]
    fn test_missing_yaml_is_empty() {
        let temp = TempDir::new().expect("tempdir");
        let layer = ConfigLayer::from_yaml(&temp.path().join("nope.yaml")).expect("yaml");
        assert!(layer.values.is_empty());
    }

    #[test]
    fn test_env_vars_prefix() {
        let layer = ConfigLayer::from_vars(vec![
            ("BT_PAGE_SIZE".to_string(), "10".to_string()),
            ("BT_DIR".to_string(), "/tmp".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);
        assert_eq!(layer.get("page-size"), Some("10"));
        assert_eq!(layer.values.len(), 1);
    }

    #[test]
    fn test_precedence() {
        let mut project = ConfigLayer::default();
        project.insert("page-size", "20".into());
        project.insert("user", "nobody".into());
        let cli = CliOverrides {
            user: Some(Uuid::nil().to_string()),
            ..CliOverrides::default()
        };

        let merged = ConfigLayer::merge_layers(&[default_config_layer(), project, cli.as_layer()]);
        assert_eq!(page_size_from_layer(&merged), 20);
        assert_eq!(
            identity_from_layer(&merged).expect("identity").user_id,
            Some(Uuid::nil())
        );
        assert_eq!(risk_threshold_from_layer(&merged), 4);
    }

    #[test]
    fn test_typed_getters_fall_back() {
        let mut layer = ConfigLayer::default();
        layer.insert("page-size", "0".into());
        layer.insert("lock-timeout", "soon".into());
        assert_eq!(page_size_from_layer(&layer), DEFAULT_PAGE_SIZE);
        assert_eq!(lock_timeout_from_layer(&layer), DEFAULT_LOCK_TIMEOUT_MS);
        assert_eq!(default_priority_from_layer(&layer).expect("priority"), Priority::P2);

        layer.insert("default-severity", "S9".into());
        assert!(default_severity_from_layer(&layer).is_err());
        layer.insert("user", "not-a-uuid".into());
        assert!(matches!(
            identity_from_layer(&layer),
            Err(TrackerError::InvalidUuid { .. })
        ));
    }

    #[test]
    fn test_db_path_resolution() {
        let dir = Path::new("/work/.bugtrack");
        let mut layer = ConfigLayer::default();
        assert_eq!(db_path_from_layer(&layer, dir), dir.join(DEFAULT_DB_FILENAME));
        layer.insert("db", "data/bt.db".into());
        assert_eq!(db_path_from_layer(&layer, dir), Path::new("/work/data/bt.db"));
        layer.insert("db", "/abs/bt.db".into());
        assert_eq!(db_path_from_layer(&layer, dir), Path::new("/abs/bt.db"));
    }

    #[test]
    fn test_open_storage_missing_db() {
        let temp = TempDir::new().expect("tempdir");
        let err = open_storage(temp.path(), &ConfigLayer::default()).unwrap_err();
        assert!(matches!(err, TrackerError::DatabaseNotFound { .. }));
    }
}
