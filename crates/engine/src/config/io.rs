//! Configuration IO helpers.

use std::env;
use std::fs;
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use dirs_next::config_dir;
use parley_util::expand_tilde;
use tracing::debug;

use crate::config::{ParleyConfig, validate_config};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "PARLEY_CONFIG_PATH";

/// Returns the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("parley").join("config.json")
}

/// Loads configuration from the default path.
pub fn load_config() -> anyhow::Result<ParleyConfig> {
    let path = default_config_path();
    load_config_from_path(&path)
}

/// Loads configuration from a specific path. A missing file yields the defaults.
pub fn load_config_from_path(path: &Path) -> anyhow::Result<ParleyConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "No configuration file, using defaults");
        return Ok(ParleyConfig::default());
    }

    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: ParleyConfig = serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Saves configuration to a specific path, creating parent directories.
pub fn save_config_to_path(config: &ParleyConfig, path: &Path) -> anyhow::Result<()> {
    validate_config(config)?;
    if let Some(parent_directory) = path.parent() {
        create_dir_all(parent_directory).with_context(|| format!("failed to create {}", parent_directory.display()))?;
    }

    let content = serde_json::to_string_pretty(config)?;
    write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_honors_environment_override() {
        let override_path = "~/custom/parley/config.json";
        temp_env::with_var(CONFIG_PATH_ENV, Some(override_path), || {
            let path = default_config_path();
            let expected = expand_tilde(override_path);
            assert_eq!(path, expected);
        });
    }

    #[test]
    fn blank_override_falls_back_to_config_dir() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("  "), || {
            let path = default_config_path();
            assert!(path.ends_with("parley/config.json"));
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        let directory = tempfile::tempdir().unwrap();
        let config = load_config_from_path(&directory.path().join("absent.json")).unwrap();
        assert_eq!(config, ParleyConfig::default());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("nested").join("config.json");
        let mut config = ParleyConfig::default();
        config.dispatcher.history_limit = 7;
        config.plugins.disabled.insert("vault".into());

        save_config_to_path(&config, &path).unwrap();
        assert_eq!(load_config_from_path(&path).unwrap(), config);
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("config.json");
        fs::write(&path, r#"{"dispatcher":{"historyLimit":0}}"#).unwrap();
        let error = load_config_from_path(&path).unwrap_err();
        assert!(error.downcast_ref::<crate::config::ValidationError>().is_some());
    }
}
