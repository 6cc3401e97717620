//! GitHub REST API commit source.
//!
//! Unauthenticated requests are limited to 60 per hour. Pass a token when
//! running from CI.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::source::CommitSource;

/// Public GitHub API.
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("slate-gitops/", env!("CARGO_PKG_VERSION"));

/// Commit source backed by the GitHub API.
pub struct GitHubSource {
    agent: ureq::Agent,
    api_base: String,
    /// `owner/name`.
    repo: String,
    token: Option<String>,
}

impl GitHubSource {
    /// Create a source for `repo` (`owner/name`) on github.com.
    #[must_use]
    pub fn new(repo: impl Into<String>) -> Self {
        Self::with_api_base(DEFAULT_GITHUB_API, repo)
    }

    /// Create a source with a custom API base.
    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>, repo: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repo: repo.into(),
            token: None,
        }
    }

    /// Authenticate requests with `token`.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Repository this source reads from.
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn commit_url(&self, sha: &str) -> String {
        format!("{}/repos/{}/commits/{}", self.api_base, self.repo, sha)
    }

    fn commits_url(&self) -> String {
        format!("{}/repos/{}/commits", self.api_base, self.repo)
    }

    fn get(&self, url: &str, context: &str) -> Result<String> {
        log::debug!("Fetching {url}");
        let mut request = self
            .agent
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }

        let mut response = request.call()?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        if status != 200 {
            return Err(Error::Status {
                context: context.to_string(),
                status,
                body,
            });
        }
        Ok(body)
    }
}

impl CommitSource for GitHubSource {
    fn commit(&self, sha: &str) -> Result<Commit> {
        let body = self.get(&self.commit_url(sha), "Can't get commit")?;
        Ok(serde_json::from_str(&body)?)
    }

    fn recent_commits(&self, limit: usize) -> Result<Vec<Commit>> {
        let url = format!("{}?per_page={}", self.commits_url(), limit.clamp(1, 100));
        let body = self.get(&url, "Can't get commit history")?;
        Ok(serde_json::from_str(&body)?)
    }
}
