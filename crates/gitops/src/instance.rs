//! Container files: `instance.yaml` (local record of remote state) and
//! `values.yaml` (opaque payload).
//!
//! `instance.yaml` is a flat list of `key: value` lines:
//! ```text
//! cluster: uchicago-prod
//! group: atlas-squid
//! app: osg-frontier-squid
//! instance: instance_2bVqW1qMSM4
//! ```
//! The file is append-only from this crate's point of view.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Local record of remote state.
pub const INSTANCE_FILE: &str = "instance.yaml";
/// Desired configuration payload.
pub const VALUES_FILE: &str = "values.yaml";

/// Cluster the instance runs on.
pub const KEY_CLUSTER: &str = "cluster";
/// Group owning the instance.
pub const KEY_GROUP: &str = "group";
/// Application name.
pub const KEY_APP: &str = "app";
/// Application chart version.
pub const KEY_APP_VERSION: &str = "appVersion";
/// Remote instance ID.
pub const KEY_INSTANCE: &str = "instance";

/// What to do with lines that have no `:` separator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedLinePolicy {
    /// Log a warning and ignore the line.
    #[default]
    Warn,
    /// Treat the line as a fatal error.
    Reject,
}

/// A line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number.
    pub line: usize,
    /// Line content.
    pub content: String,
}

/// Parsed `instance.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceConfig {
    values: BTreeMap<String, String>,
    diagnostics: Vec<Diagnostic>,
}

impl InstanceConfig {
    /// Parse `key: value` lines.
    ///
    /// Blank lines and `#` comments are ignored. The key is everything before
    /// the first `:`, so values may contain colons. Later duplicates win.
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once(':') {
                Some((key, value)) if !key.trim().is_empty() => {
                    config
                        .values
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
                _ => config.diagnostics.push(Diagnostic {
                    line: idx + 1,
                    content: raw.to_string(),
                }),
            }
        }

        config
    }

    /// Raw value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of `key` if present and not blank.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Recorded remote instance ID.
    pub fn instance_id(&self) -> Option<&str> {
        self.non_empty(KEY_INSTANCE)
    }

    /// Whether the container has been provisioned.
    pub fn is_provisioned(&self) -> bool {
        self.instance_id().is_some()
    }

    /// Cluster name.
    pub fn cluster(&self) -> Option<&str> {
        self.non_empty(KEY_CLUSTER)
    }

    /// Group name.
    pub fn group(&self) -> Option<&str> {
        self.non_empty(KEY_GROUP)
    }

    /// Application name.
    pub fn app(&self) -> Option<&str> {
        self.non_empty(KEY_APP)
    }

    /// Application version, if pinned.
    pub fn app_version(&self) -> Option<&str> {
        self.non_empty(KEY_APP_VERSION)
    }

    /// Lines that could not be parsed.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Read a container's `instance.yaml`.
///
/// A missing file yields an empty config (the container was never
/// provisioned).
pub fn read_instance_config(path: &Path, policy: MalformedLinePolicy) -> Result<InstanceConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} does not exist yet", path.display());
            String::new()
        }
        Err(e) => return Err(Error::io(path, e)),
    };

    let config = InstanceConfig::parse(&content);
    for diagnostic in config.diagnostics() {
        match policy {
            MalformedLinePolicy::Warn => log::warn!(
                "Skipping malformed line {} in {}: {:?}",
                diagnostic.line,
                path.display(),
                diagnostic.content
            ),
            MalformedLinePolicy::Reject => {
                return Err(Error::MalformedLine {
                    path: path.to_path_buf(),
                    line: diagnostic.line,
                    content: diagnostic.content.clone(),
                });
            }
        }
    }

    Ok(config)
}

/// Append `instance: <id>` to `instance.yaml`, creating it if needed.
///
/// Earlier lines are never rewritten. A newline is inserted first when the
/// file does not already end with one.
pub fn append_instance_id(path: &Path, id: &str) -> Result<()> {
    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::io(path, e)),
    };

    let mut entry = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        entry.push('\n');
    }
    entry.push_str(&format!("{KEY_INSTANCE}: {id}\n"));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(entry.as_bytes())
        .map_err(|e| Error::io(path, e))?;

    Ok(())
}

/// Read a container's `values.yaml` verbatim.
pub fn read_values(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
