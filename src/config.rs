//! Persisted CLI configuration (spec §6 "Persisted state").
//!
//! Config lives at `<XDG_CONFIG_HOME or ~/.config>/browser-use/config.json`.
//! An unreadable or invalid file is backed up to `*.backup.<unix_ts>` and
//! replaced with defaults rather than failing startup.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::errors::CliError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub allowed_domains: Vec<String>,
    pub headless: bool,
}

/// `$BROWSER_USE_CONFIG_DIR`, else `$XDG_CONFIG_HOME/browser-use`, else
/// `~/.config/browser-use` (spec §6 environment variables).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BROWSER_USE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".config"));
    base.join("browser-use")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn command_history_path() -> PathBuf {
    config_dir().join("command_history.json")
}

/// Loads config, backing up and resetting to defaults on any read/parse
/// failure rather than propagating the error.
pub fn load_or_default() -> AppConfig {
    let path = config_path();
    match std::fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(_) => {
                backup_invalid(&path);
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}

fn backup_invalid(path: &Path) {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let backup = path.with_extension(format!("json.backup.{ts}"));
    let _ = std::fs::rename(path, backup);
}

pub fn save(config: &AppConfig) -> Result<(), CliError> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let serialized = serde_json::to_string_pretty(config)?;
    std::fs::write(config_path(), serialized)?;
    Ok(())
}

/// Expands a leading `~` to the user's home directory (spec §6 "Tilde
/// expansion on paths").
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_leading_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/downloads"), home.join("downloads"));
        }
    }

    #[test]
    fn leaves_absolute_paths_unchanged() {
        assert_eq!(expand_tilde("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
