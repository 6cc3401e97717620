//! Aggregate a commit into the values the mail templates render.

use crate::commit::Commit;
use chrono::{DateTime, Utc};
use gitops::{INSTANCE_FILE, InstanceConfig};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Label used when a file's change size could not be determined.
pub const UNKNOWN_SIZE: &str = "unknown";

/// One changed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// Path relative to the repository root.
    pub name: String,
    /// Changed lines, when known.
    pub size: Option<u64>,
    /// `size` as display text.
    pub size_label: String,
    /// Unified diff, if the API returned one.
    pub patch: Option<String>,
}

/// Template context describing one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub author: String,
    pub date: String,
    pub message: String,
    pub commit_url: String,
    /// Clusters touched by the commit, sorted.
    pub sites: Vec<String>,
    pub changes: Vec<FileChange>,
    /// Sum of the known per-file sizes.
    pub change_size: u64,
}

/// Build the summary for `commit`, resolving cluster names against the
/// checkout at `root`.
pub fn build_summary(commit: &Commit, root: &Path) -> ChangeSummary {
    let mut sites = BTreeSet::new();
    let mut changes = Vec::with_capacity(commit.files.len());
    let mut change_size = 0;

    for file in &commit.files {
        let Some(container) = container_of(&file.filename) else {
            log::debug!("Leaving {} out of the summary", file.filename);
            continue;
        };
        sites.insert(cluster_name(root, container));

        let size = file.change_size();
        if size.is_none() {
            log::debug!("No usable change size for {}", file.filename);
        }
        change_size += size.unwrap_or(0);
        changes.push(FileChange {
            name: file.filename.clone(),
            size,
            size_label: size.map_or_else(|| UNKNOWN_SIZE.to_string(), |s| s.to_string()),
            patch: file.patch.clone(),
        });
    }

    ChangeSummary {
        author: commit.commit.author.name.clone(),
        date: format_date(&commit.commit.author.date),
        message: commit.commit.message.clone(),
        commit_url: commit.html_url.clone(),
        sites: sites.into_iter().collect(),
        changes,
        change_size,
    }
}

/// Container directory for a changed path, or `None` for paths that do not
/// belong to a deployment.
fn container_of(path: &str) -> Option<&str> {
    let (container, _) = path.split_once('/')?;
    if container.is_empty() {
        return None;
    }
    let hidden = path.split('/').any(|segment| segment.starts_with('.'));
    let template = path.split('/').any(|segment| segment == "templates");
    if hidden || template {
        return None;
    }
    Some(container)
}

/// Cluster a container deploys to: the `cluster` key of its instance file,
/// falling back to the container name.
pub fn cluster_name(root: &Path, container: &str) -> String {
    let path = root.join(container).join(INSTANCE_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => InstanceConfig::parse(&content)
            .cluster()
            .map_or_else(|| container.to_string(), ToString::to_string),
        Err(e) => {
            log::debug!("Can't read {}: {e}", path.display());
            container.to_string()
        }
    }
}

fn format_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_string(),
        |date| date.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
