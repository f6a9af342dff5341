//! # Settings Loader
//!
//! Reads [`AppConfig`] from `config.toml` and the environment.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. AppConfig::default()                                               │
//! │  2. config.toml       explicit path, else the platform config dir     │
//! │                       (Linux: ~/.config/podb/config.toml)             │
//! │  3. PODB_* env vars   PODB_NUMBER_PREFIX, PODB_DATABASE_PATH, ...     │
//! │  4. validate()                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing file is not an error; defaults are used.

use std::path::{Path, PathBuf};

use podb_core::AppConfig;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "podb.db";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "podb", "podb")
}

/// Platform location of `config.toml`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Platform location of the database file, if a home directory is known.
pub fn default_database_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE))
}

/// Loads the application config from file and `PODB_*` environment variables.
///
/// ## Example
/// ```rust,ignore
/// let config = load_app_config(None)?;
/// let db_path = database_path(&config)?;
/// ```
pub fn load_app_config(config_path: Option<PathBuf>) -> DbResult<AppConfig> {
    load_app_config_with(config_path, |key| std::env::var(key).ok())
}

/// Same as [`load_app_config`] with an explicit variable lookup.
pub fn load_app_config_with<F>(config_path: Option<PathBuf>, lookup: F) -> DbResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AppConfig::default();

    if let Some(path) = config_path.or_else(default_config_path) {
        if path.exists() {
            info!(?path, "Loading config from file");
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| DbError::Config(format!("{}: {e}", path.display())))?;
            config = AppConfig::from_toml_str(&contents)?;
        } else {
            debug!(?path, "Config file not found, using defaults");
        }
    }

    config.apply_overrides(lookup);
    config.validate()?;

    Ok(config)
}

/// Loads config or returns the default if loading fails.
pub fn load_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_app_config(config_path).unwrap_or_else(|e| {
        warn!("Failed to load config: {}. Using defaults.", e);
        AppConfig::default()
    })
}

/// Writes the config as TOML, creating the parent directory.
pub fn save_app_config(config: &AppConfig, config_path: Option<PathBuf>) -> DbResult<()> {
    let path = config_path
        .or_else(default_config_path)
        .ok_or_else(|| DbError::Config("No config path available".into()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| DbError::Config(format!("{}: {e}", parent.display())))?;
    }

    let contents = config.to_toml_string()?;
    std::fs::write(&path, contents)
        .map_err(|e| DbError::Config(format!("{}: {e}", path.display())))?;

    info!(?path, "Config saved");
    Ok(())
}

/// The database file to open: `[database].path`, else the platform data dir.
pub fn database_path(config: &AppConfig) -> DbResult<PathBuf> {
    config
        .database
        .path
        .clone()
        .or_else(default_database_path)
        .ok_or_else(|| DbError::Config("No database path available".into()))
}

/// Creates the directory a database file will live in.
pub fn ensure_parent_dir(path: &Path) -> DbResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| DbError::Config(format!("{}: {e}", parent.display()))),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use podb_core::{CoreError, TaxRateSource};

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("podb-settings-{}-{name}", std::process::id()))
            .join(CONFIG_FILE)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load_app_config_with(Some(scratch("missing")), no_env).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch("round-trip");
        let mut config = AppConfig::default();
        config.purchase_order.number_prefix = "WO".to_string();
        config.totals.tax_rate_source = TaxRateSource::OrderSnapshot;

        save_app_config(&config, Some(path.clone())).unwrap();
        let loaded = load_app_config_with(Some(path.clone()), no_env).unwrap();

        assert_eq!(loaded.number_prefix(), "WO");
        assert_eq!(loaded.tax_rate_source(), TaxRateSource::OrderSnapshot);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_env_overrides_file() {
        let path = scratch("env");
        save_app_config(&AppConfig::default(), Some(path.clone())).unwrap();

        let config = load_app_config_with(Some(path.clone()), |key| match key {
            "PODB_NUMBER_PREFIX" => Some("REQ".to_string()),
            "PODB_DATABASE_PATH" => Some("/srv/podb/orders.db".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.number_prefix(), "REQ");
        assert_eq!(
            database_path(&config).unwrap(),
            PathBuf::from("/srv/podb/orders.db")
        );
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let path = scratch("invalid");
        ensure_parent_dir(&path).unwrap();
        std::fs::write(&path, "[purchase_order]\nnumber_prefix = \"TOOLONG\"\n").unwrap();

        let err = load_app_config_with(Some(path.clone()), no_env).unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Config(_))));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
