//! Where commits come from.
//!
//! [`github::GitHubSource`] talks to the GitHub REST API. [`MockSource`]
//! serves canned commits for tests.

pub mod github;

use crate::commit::Commit;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Source of commit data for one repository.
pub trait CommitSource: Send + Sync {
    /// Fetch a single commit, including its changed files.
    fn commit(&self, sha: &str) -> Result<Commit>;

    /// Fetch up to `limit` commits from the default branch, newest first.
    fn recent_commits(&self, limit: usize) -> Result<Vec<Commit>>;
}

#[derive(Debug, Default)]
struct MockState {
    commits: HashMap<String, Commit>,
    history: Vec<Commit>,
    requests: Vec<String>,
}

/// In-memory commit source.
///
/// Clones share state, so a test can keep a handle after passing one in.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `commit` available by SHA.
    pub fn add_commit(&self, commit: Commit) {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.commits.insert(commit.sha.clone(), commit);
    }

    /// Set the branch history returned by `recent_commits`.
    pub fn set_history(&self, history: Vec<Commit>) {
        self.state.lock().expect("mock state poisoned").history = history;
    }

    /// SHAs requested through `commit`, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().expect("mock state poisoned").requests.clone()
    }
}

impl CommitSource for MockSource {
    fn commit(&self, sha: &str) -> Result<Commit> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.requests.push(sha.to_string());
        state
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| Error::Status {
                context: "Can't get commit".to_string(),
                status: 404,
                body: "Not Found".to_string(),
            })
    }

    fn recent_commits(&self, limit: usize) -> Result<Vec<Commit>> {
        let state = self.state.lock().expect("mock state poisoned");
        Ok(state.history.iter().take(limit).cloned().collect())
    }
}
