//! Commit model and merge-commit resolution.

use crate::error::{Error, Result};
use crate::source::CommitSource;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// History entries scanned when resolving a merge commit.
pub const DEFAULT_HISTORY_DEPTH: usize = 30;

static MERGE_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Merge (pull request|branch|remote-tracking branch) ").expect("valid regex")
});

/// A commit as returned by the commit-history API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA.
    pub sha: String,
    /// Link to the commit page.
    #[serde(default)]
    pub html_url: String,
    /// Author and message.
    pub commit: CommitDetail,
    /// Parent commits.
    #[serde(default)]
    pub parents: Vec<ParentRef>,
    /// Changed files (only present on single-commit responses).
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

/// Message and authorship of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    /// Full commit message.
    pub message: String,
    /// Author signature.
    pub author: Signature,
}

/// Author name and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Author name.
    pub name: String,
    /// ISO 8601 timestamp.
    pub date: String,
}

/// Reference to a parent commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    /// Parent SHA.
    pub sha: String,
}

/// A file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    /// Path relative to the repository root.
    pub filename: String,
    /// Number of changed lines. Kept loose: the size is best-effort.
    #[serde(default)]
    pub changes: serde_json::Value,
    /// Unified diff, absent for binary or very large files.
    #[serde(default)]
    pub patch: Option<String>,
}

impl CommitFile {
    /// Number of changed lines, if the API reported a usable number.
    pub fn change_size(&self) -> Option<u64> {
        match &self.changes {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Commit {
    /// Whether this is a merge commit.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1 || MERGE_MESSAGE.is_match(&self.commit.message)
    }
}

/// Fetch `sha` and, if it is a merge, substitute the most recent non-merge
/// commit that precedes it in history.
pub fn resolve_commit(source: &dyn CommitSource, sha: &str, depth: usize) -> Result<Commit> {
    let commit = source.commit(sha)?;
    if !commit.is_merge() {
        return Ok(commit);
    }

    log::info!("{sha} is a merge commit, looking for the commit it merged");
    let history = source.recent_commits(depth)?;
    let position = history
        .iter()
        .position(|c| c.sha == commit.sha || c.sha.starts_with(sha))
        .ok_or_else(|| Error::CommitNotInHistory {
            sha: sha.to_string(),
            depth: history.len(),
        })?;

    let previous = history[position + 1..]
        .iter()
        .find(|c| !c.is_merge())
        .ok_or_else(|| Error::NoMergeParent(sha.to_string()))?;

    log::info!("Using {} in place of merge commit {sha}", previous.sha);
    source.commit(&previous.sha)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::source::MockSource;

    pub(crate) fn commit(sha: &str, message: &str, parents: usize) -> Commit {
        Commit {
            sha: sha.to_string(),
            html_url: format!("https://github.com/slateci/atlas-squid/commit/{sha}"),
            commit: CommitDetail {
                message: message.to_string(),
                author: Signature {
                    name: "Lincoln Bryant".to_string(),
                    date: "2021-03-04T17:21:09Z".to_string(),
                },
            },
            parents: (0..parents)
                .map(|i| ParentRef {
                    sha: format!("{sha}-parent{i}"),
                })
                .collect(),
            files: Vec::new(),
        }
    }

    #[test]
    fn test_is_merge() {
        assert!(commit("a", "Merge pull request #12 from slateci/bump", 1).is_merge());
        assert!(commit("a", "Merge branch 'master' into uchicago", 1).is_merge());
        assert!(commit("a", "Sync with upstream", 2).is_merge());
        assert!(!commit("a", "Update MWT2 squid cache size", 1).is_merge());
        assert!(!commit("a", "Merged configs for AGLT2", 1).is_merge());
    }

    #[test]
    fn test_change_size() {
        let mut file = CommitFile {
            filename: "mwt2/values.yaml".to_string(),
            changes: serde_json::json!(12),
            patch: None,
        };
        assert_eq!(file.change_size(), Some(12));
        file.changes = serde_json::json!("7");
        assert_eq!(file.change_size(), Some(7));
        file.changes = serde_json::json!("lots");
        assert_eq!(file.change_size(), None);
        file.changes = serde_json::Value::Null;
        assert_eq!(file.change_size(), None);
    }

    #[test]
    fn test_resolve_plain_commit() {
        let source = MockSource::new();
        source.add_commit(commit("abc", "Update values", 1));

        let resolved = resolve_commit(&source, "abc", DEFAULT_HISTORY_DEPTH).unwrap();
        assert_eq!(resolved.sha, "abc");
    }

    #[test]
    fn test_resolve_merge_commit() {
        let source = MockSource::new();
        source.add_commit(commit("m1", "Merge pull request #3 from site/update", 2));
        source.add_commit(commit("m0", "Merge branch 'master'", 2));
        source.add_commit(commit("c1", "Bump squid memory", 1));
        source.set_history(vec![
            commit("newer", "Later change", 1),
            commit("m1", "Merge pull request #3 from site/update", 2),
            commit("m0", "Merge branch 'master'", 2),
            commit("c1", "Bump squid memory", 1),
        ]);

        let resolved = resolve_commit(&source, "m1", DEFAULT_HISTORY_DEPTH).unwrap();
        assert_eq!(resolved.sha, "c1");
        assert_eq!(resolved.commit.message, "Bump squid memory");
    }

    #[test]
    fn test_resolve_merge_not_in_history() {
        let source = MockSource::new();
        source.add_commit(commit("m1", "Merge pull request #3 from site/update", 2));
        source.set_history(vec![commit("other", "x", 1)]);

        let err = resolve_commit(&source, "m1", DEFAULT_HISTORY_DEPTH).unwrap_err();
        assert!(matches!(err, Error::CommitNotInHistory { .. }));
    }

    #[test]
    fn test_resolve_merge_without_predecessor() {
        let source = MockSource::new();
        source.add_commit(commit("m1", "Merge pull request #3 from site/update", 2));
        source.set_history(vec![commit("m1", "Merge pull request #3 from site/update", 2)]);

        let err = resolve_commit(&source, "m1", DEFAULT_HISTORY_DEPTH).unwrap_err();
        assert!(matches!(err, Error::NoMergeParent(_)));
    }

    #[test]
    fn test_deserialize_github_commit() {
        let body = r#"{
            "sha": "6dcb09b",
            "html_url": "https://github.com/slateci/atlas-squid/commit/6dcb09b",
            "commit": {
                "message": "Fix cache dir",
                "author": {"name": "Monalisa Octocat", "email": "m@example.org", "date": "2011-04-14T16:00:49Z"}
            },
            "parents": [{"sha": "7638417", "url": "https://api.github.com/..."}],
            "files": [
                {"filename": "mwt2/values.yaml", "changes": 3, "patch": "@@ -1 +1 @@"},
                {"filename": "logo.png", "changes": 0}
            ]
        }"#;
        let commit: Commit = serde_json::from_str(body).unwrap();
        assert_eq!(commit.files.len(), 2);
        assert_eq!(commit.files[0].change_size(), Some(3));
        assert_eq!(commit.files[1].patch, None);
        assert!(!commit.is_merge());
    }
}
