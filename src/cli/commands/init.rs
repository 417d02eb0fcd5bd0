use crate::config::{DEFAULT_DB_FILENAME, DIR_NAME};
use crate::error::{Result, TrackerError};
use crate::storage::SqliteStorage;
use std::fs;
use std::path::Path;
use tracing::info;

const CONFIG_TEMPLATE: &str = r"# bugtrack project configuration
# user: 00000000-0000-0000-0000-000000000000
# page-size: 50
# risk-threshold-hours: 4
# default-priority: P2
# default-severity: S2
";

const GITIGNORE: &str = r"# Database
*.db
*.db-shm
*.db-wal
";

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` when a database exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(force: bool, json: bool, root_dir: Option<&Path>) -> Result<()> {
    let base_dir = root_dir.unwrap_or_else(|| Path::new("."));
    let dir = base_dir.join(DIR_NAME);
    let db_path = dir.join(DEFAULT_DB_FILENAME);

    if db_path.exists() {
        if !force {
            return Err(TrackerError::AlreadyInitialized { path: db_path });
        }
        fs::remove_file(&db_path)?;
    }
    fs::create_dir_all(&dir)?;

    // Opening applies the schema.
    SqliteStorage::open(&db_path)?;

    let config_path = dir.join("config.yaml");
    if !config_path.exists() {
        fs::write(config_path, CONFIG_TEMPLATE)?;
    }
    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(gitignore_path, GITIGNORE)?;
    }

    info!(path = %db_path.display(), "Initialized workspace");
    if json {
        super::print_json(&serde_json::json!({
            "path": dir.display().to_string(),
            "database": db_path.display().to_string(),
        }))?;
    } else {
        println!("Initialized bugtrack workspace in {DIR_NAME}/");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_files() {
        let temp = TempDir::new().expect("tempdir");
        execute(false, true, Some(temp.path())).expect("init");

        let dir = temp.path().join(DIR_NAME);
        assert!(dir.join(DEFAULT_DB_FILENAME).exists());
        assert!(dir.join("config.yaml").exists());
        assert!(dir.join(".gitignore").exists());
    }

    #[test]
    fn test_init_twice_requires_force() {
        let temp = TempDir::new().expect("tempdir");
        execute(false, true, Some(temp.path())).expect("init");

        let err = execute(false, true, Some(temp.path())).unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyInitialized { .. }));
        execute(true, true, Some(temp.path())).expect("force init");
    }
}
