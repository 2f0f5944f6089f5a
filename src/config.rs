use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::version::types::SelectionRule;

// =============================================================================
// Request-related constants
// =============================================================================

/// Timeout for every version request in milliseconds (4 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 4_000;

/// Storage key of the durable current-version slot
pub const CURRENT_VERSION_KEY: &str = "CURRENT_VERSION";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "VERSION_CHECK_CONFIG";

/// Selection rules used when the caller supplies none:
/// the ten most recent pull-request builds followed by every `master` build.
pub fn default_versions_to_fetch() -> Vec<SelectionRule> {
    vec![
        SelectionRule::TopPrs(10),
        SelectionRule::Branch("master".to_string()),
    ]
}

/// Client configuration, read from `config.json` in the data directory
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckerConfig {
    /// URL serving `{ "version": "..." }`
    pub version_url: Option<String>,
    /// URL serving the `{ "prs": [...], "branches": [...] }` catalog
    pub versions_url: Option<String>,
    pub versions_to_fetch: Vec<SelectionRule>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            version_url: None,
            versions_url: None,
            versions_to_fetch: default_versions_to_fetch(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Loads the configuration from [`config_path`].
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config() -> Result<CheckerConfig, ConfigError> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<CheckerConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CheckerConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the path to the data directory for version-check.
/// Uses $XDG_DATA_HOME/version-check if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/version-check,
/// or ./version-check if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file holding the current version.
pub fn db_path() -> PathBuf {
    data_dir().join("versions.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("version-check.log")
}

/// Returns the path to the config file, honoring `VERSION_CHECK_CONFIG`.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("config.json"))
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("version-check")
}
