//! Application configuration for readme-index.
//!
//! An optional `readme-index.toml` lives at the repository root.
//! CLI flags override environment values, which override the config file,
//! which overrides defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReadmeIndexError, Result};

/// Default configuration file name, looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = "readme-index.toml";

/// Environment variable holding the `owner/repo` identifier in GitHub Actions.
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// README path, relative to the repository root.
    #[serde(default = "default_readme")]
    pub readme: PathBuf,

    /// `owner/repo` identifier used to build blob links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Branch name used in blob links.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Directory names the collector never descends into.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            readme: default_readme(),
            repository: None,
            branch: default_branch(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

fn default_readme() -> PathBuf {
    PathBuf::from("README.md")
}
fn default_branch() -> String {
    "master".into()
}
fn default_exclude_dirs() -> Vec<String> {
    vec![".git".into()]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the default config file for a repository root.
pub fn config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Load the config for a repository root. Returns defaults if the file does not exist.
pub fn load_config(root: &Path) -> Result<AppConfig> {
    let path = config_file_path(root);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the config from a specific file path. The file must exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReadmeIndexError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ReadmeIndexError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    tracing::debug!(?path, "loaded config file");
    Ok(config)
}
