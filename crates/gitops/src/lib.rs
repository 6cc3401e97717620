//! # gitops
//!
//! Reconcile a configuration repository against the SLATE deployment API.
//!
//! The repository holds one directory ("container") per deployed
//! application instance:
//!
//! ```text
//! mwt2-squid/
//!   values.yaml     # desired configuration, sent verbatim
//!   instance.yaml   # cluster / group / app, plus the instance ID once provisioned
//! ```
//!
//! A CI job lists the files changed by a commit and hands them to
//! [`Reconciler::run`], which creates, updates or skips instances and
//! appends newly assigned IDs to `instance.yaml`.
//!
//! ## Example
//!
//! ```no_run
//! use gitops::{ReconcileOptions, Reconciler, StdoutSignal, read_change_list};
//! use std::path::Path;
//!
//! let lines = read_change_list(Path::new("changed_files"))?;
//! let client = slate::Client::new(slate::DEFAULT_API_BASE, "token");
//! let reconciler = Reconciler::new(client, ReconcileOptions::default());
//! let summary = reconciler.run(&lines, &mut StdoutSignal::new())?;
//! println!("{} instances changed", summary.total_changes());
//! # Ok::<(), gitops::Error>(())
//! ```

pub mod changes;
pub mod classify;
pub mod error;
pub mod instance;
pub mod reconcile;
pub mod signal;
pub mod types;

pub use changes::{ChangeLine, ChangeRecord, ChangeStatus, parse_change_list, read_change_list};
pub use classify::{Classification, SkipReason, classify};
pub use error::{Error, Result};
pub use instance::{
    Diagnostic, INSTANCE_FILE, InstanceConfig, MalformedLinePolicy, VALUES_FILE,
    append_instance_id, read_instance_config,
};
pub use reconcile::{ReconcileOptions, Reconciler};
pub use signal::{CountingSignal, PUSH_MARKER, PushSignal, StdoutSignal};
pub use types::{Outcome, RunSummary};
