//! Per-entry outcomes and run summaries.

use crate::changes::ChangeRecord;
use crate::classify::SkipReason;

/// What happened to one change list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new instance was provisioned and its ID recorded.
    Created { id: String },
    /// An existing instance received the new configuration.
    Updated { id: String },
    /// Added entry for a container that already has an instance.
    AlreadyProvisioned { id: String },
    /// The update call failed; the run continued.
    UpdateFailed {
        id: String,
        /// HTTP status, if a response was received.
        status: Option<u16>,
    },
    /// Deleted entry; the remote instance keeps running.
    DeletionUnsupported,
    /// Entry not acted upon.
    Skipped { reason: SkipReason },
}

impl Outcome {
    /// Whether the repository state changed and needs pushing.
    pub fn requires_push(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Updated { .. })
    }
}

/// Summary of a reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Entries in processing order. Malformed lines and unknown statuses have
    /// no record.
    pub entries: Vec<(Option<ChangeRecord>, Outcome)>,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub unsupported: usize,
    pub skipped: usize,
}

impl RunSummary {
    /// Whether any entry requires a push.
    pub fn push_required(&self) -> bool {
        self.entries.iter().any(|(_, outcome)| outcome.requires_push())
    }

    /// Number of remote changes made.
    pub fn total_changes(&self) -> usize {
        self.created + self.updated
    }

    /// Total number of entries processed.
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Add an outcome to the summary.
    pub fn add(&mut self, record: Option<ChangeRecord>, outcome: Outcome) {
        match &outcome {
            Outcome::Created { .. } => self.created += 1,
            Outcome::Updated { .. } => self.updated += 1,
            Outcome::AlreadyProvisioned { .. } => self.unchanged += 1,
            Outcome::UpdateFailed { .. } => self.failed += 1,
            Outcome::DeletionUnsupported => self.unsupported += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
        }
        self.entries.push((record, outcome));
    }
}
