//! Optional TOML settings file.
//!
//! Every field has a default, so an absent file and an empty file behave
//! the same. Command-line flags override whatever the file says.

use anyhow::{Context, Result};
use gitops::MalformedLinePolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file looked up in the working directory when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "slate-gitops.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub slate: SlateSettings,
    pub notify: NotifySettings,
}

/// Deployment API and reconciliation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlateSettings {
    pub api_base: String,
    pub root: PathBuf,
    pub lookup_attempts: u32,
    /// Seconds.
    pub backoff: u64,
    pub malformed_lines: MalformedLinePolicy,
}

impl Default for SlateSettings {
    fn default() -> Self {
        Self {
            api_base: slate::DEFAULT_API_BASE.to_string(),
            root: PathBuf::from("."),
            lookup_attempts: slate::PROVISIONING_ATTEMPTS,
            backoff: slate::DEFAULT_BACKOFF_SECS,
            malformed_lines: MalformedLinePolicy::Warn,
        }
    }
}

/// Change mail settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    /// GitHub repository, `owner/name`.
    pub repo: String,
    pub github_api: String,
    pub templates: Option<PathBuf>,
    pub output: PathBuf,
    pub history_depth: usize,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            repo: "slateci/atlas-squid".to_string(),
            github_api: changemail::source::github::DEFAULT_GITHUB_API.to_string(),
            templates: None,
            output: PathBuf::from("."),
            history_depth: changemail::DEFAULT_HISTORY_DEPTH,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from [`DEFAULT_SETTINGS_FILE`] if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_SETTINGS_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    log::debug!("No {DEFAULT_SETTINGS_FILE}, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
