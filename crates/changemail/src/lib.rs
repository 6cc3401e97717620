//! # changemail
//!
//! Turn a configuration-repository commit into a notification email.
//!
//! The pipeline has two halves, usually run as separate CI steps:
//!
//! 1. [`compose`]: fetch the commit (skipping past merge commits), work out
//!    which clusters it touches and render plain-text and HTML bodies.
//! 2. [`deliver`]: post a message built from `MAILGUN_*` settings.
//!
//! ## Example
//!
//! ```no_run
//! use changemail::{GitHubSource, Templates, compose, DEFAULT_HISTORY_DEPTH};
//! use std::path::Path;
//!
//! let source = GitHubSource::new("slateci/atlas-squid");
//! let templates = Templates::builtin()?;
//! let mail = compose(&source, "6dcb09b", Path::new("."), &templates, DEFAULT_HISTORY_DEPTH)?;
//! mail.write_to(Path::new("."))?;
//! # Ok::<(), changemail::Error>(())
//! ```

pub mod commit;
pub mod error;
pub mod mailgun;
pub mod render;
pub mod source;
pub mod summary;

pub use commit::{Commit, CommitFile, DEFAULT_HISTORY_DEPTH, resolve_commit};
pub use error::{Error, Result};
pub use mailgun::{
    MailTransport, MailgunConfig, MailgunTransport, Message, NO_CHANGES_BODY, RecordingTransport,
};
pub use render::{HTML_BODY_FILE, RenderedMail, TEXT_BODY_FILE, Templates};
pub use source::github::GitHubSource;
pub use source::{CommitSource, MockSource};
pub use summary::{ChangeSummary, FileChange, build_summary, cluster_name};

use std::path::Path;

/// Render the mail bodies for commit `sha`.
///
/// `root` is the checkout used to resolve cluster names.
pub fn compose(
    source: &dyn CommitSource,
    sha: &str,
    root: &Path,
    templates: &Templates,
    depth: usize,
) -> Result<RenderedMail> {
    let commit = resolve_commit(source, sha, depth)?;
    log::info!(
        "Summarizing {} ({} files changed)",
        commit.sha,
        commit.files.len()
    );
    let summary = build_summary(&commit, root);
    templates.render(&summary)
}

/// Send one message built from `config`, with an optional HTML part.
pub fn deliver(
    transport: &dyn MailTransport,
    config: &MailgunConfig,
    html: Option<String>,
) -> Result<Message> {
    let message = config.message(html);
    log::info!("Sending '{}' to {}", message.subject, message.to);
    transport.send(config, &message)?;
    Ok(message)
}
