//! Error types for reconciliation runs.
//!
//! Every variant here aborts the run. Per-entry problems that the run
//! survives (failed updates, skipped paths) are reported as
//! [`crate::Outcome`] values instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal reconciliation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The change list could not be read.
    #[error("failed to read change list {path}: {source}")]
    ChangeList {
        /// Path of the change list.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The diff producer emitted a status other than M, A or D.
    #[error("invalid file status '{status}' for {path} on line {line}")]
    UnknownStatus {
        /// 1-based line in the change list.
        line: usize,
        /// Status token as written.
        status: String,
        /// Path that followed the status.
        path: String,
    },

    /// A key needed for provisioning is missing from `instance.yaml`.
    #[error("{path} is missing required key '{key}'")]
    MissingKey {
        /// Path of the `instance.yaml`.
        path: PathBuf,
        /// Missing key.
        key: &'static str,
    },

    /// A malformed line was found while malformed lines are rejected.
    #[error("malformed line {line} in {path}: {content:?}")]
    MalformedLine {
        /// Path of the file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Line content.
        content: String,
    },

    /// IO error while reading or writing container files.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The API refused to create an instance.
    #[error("creating instance for {container} failed with HTTP {status}: {body}")]
    CreateRejected {
        /// Container being provisioned.
        container: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The created instance's ID could not be recovered.
    #[error("could not determine instance id for {app} on {cluster} after {attempts} lookups")]
    InstanceIdUnresolved {
        /// Cluster queried.
        cluster: String,
        /// Application queried.
        app: String,
        /// Lookups made.
        attempts: u32,
    },

    /// Deployment API transport failure during provisioning.
    #[error(transparent)]
    Remote(#[from] slate::Error),
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
