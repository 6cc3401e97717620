//! Error types for the notification pipeline.

use std::io;
use std::path::PathBuf;

/// Result type alias for notification operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or sending change mail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// A remote API answered with a non-success status.
    #[error("{context} got HTTP code {status}: {body}")]
    Status {
        /// What was being attempted.
        context: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The commit to examine could not be determined.
    #[error("commit {sha} not found in the last {depth} commits")]
    CommitNotInHistory {
        /// Commit searched for.
        sha: String,
        /// Number of history entries scanned.
        depth: usize,
    },

    /// No earlier non-merge commit follows the merge commit.
    #[error("no non-merge commit precedes merge commit {0}")]
    NoMergeParent(String),

    /// Required mailer settings are missing.
    #[error("Not all mailgun variables set, missing: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    /// Template could not be compiled or rendered.
    #[error("template error: {0}")]
    Template(String),

    /// IO error.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_lists_all() {
        let err = Error::MissingConfig(vec![
            "MAILGUN_DOMAIN".to_string(),
            "MAILGUN_FROM".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Not all mailgun variables set, missing: MAILGUN_DOMAIN, MAILGUN_FROM"
        );
    }

    #[test]
    fn test_status_display() {
        let err = Error::Status {
            context: "Can't get commit".to_string(),
            status: 404,
            body: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "Can't get commit got HTTP code 404: Not Found");
    }
}
