//! Decide whether a changed path belongs to a container.
//!
//! A container is the directory holding `values.yaml` and `instance.yaml`.
//! Anything that does not clearly look like one is skipped.

use crate::instance::{INSTANCE_FILE, VALUES_FILE};
use std::fmt;

/// Why a path was not acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The container name contains a `.`: hidden or system path.
    HiddenPath,
    /// Neither `values.yaml` nor `instance.yaml`.
    NotContainerFile,
    /// `instance.yaml` edited by hand (application version updates).
    VersionUpdate,
    /// The change list line had no path.
    MalformedLine,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::HiddenPath => "not a container",
            Self::NotContainerFile => "not a container file",
            Self::VersionUpdate => "version updates are not implemented",
            Self::MalformedLine => "malformed change entry",
        };
        f.write_str(text)
    }
}

/// Classification of a changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// `values.yaml` of the named container.
    Container(String),
    /// `instance.yaml` of the named container.
    VersionUpdate(String),
    /// Not acted upon.
    Skip(SkipReason),
}

/// Classify a path from the change list.
pub fn classify(path: &str) -> Classification {
    if path.contains(VALUES_FILE) {
        let container = container_of(path, VALUES_FILE);
        if container.contains('.') {
            return Classification::Skip(SkipReason::HiddenPath);
        }
        return Classification::Container(container.to_string());
    }

    if path.contains(INSTANCE_FILE) {
        let container = container_of(path, INSTANCE_FILE);
        if container.contains('.') {
            return Classification::Skip(SkipReason::HiddenPath);
        }
        return Classification::VersionUpdate(container.to_string());
    }

    Classification::Skip(SkipReason::NotContainerFile)
}

/// Everything before `/<file>`, or the whole path if that does not occur.
fn container_of<'a>(path: &'a str, file: &str) -> &'a str {
    let marker = format!("/{file}");
    path.split(marker.as_str()).next().unwrap_or(path)
}
