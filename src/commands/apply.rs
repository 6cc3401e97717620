//! `slate-gitops apply`: push changed containers to the deployment API.

use crate::Context;
use crate::cli::ApplyArgs;
use crate::settings::SlateSettings;
use crate::ui;
use anyhow::{Context as _, Result};
use gitops::{
    MalformedLinePolicy, Outcome, ReconcileOptions, Reconciler, RunSummary, StdoutSignal,
    read_change_list,
};
use slate::{Client, RetryPolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Effective settings for one `apply` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    pub changes_file: PathBuf,
    pub token: String,
    pub api_base: String,
    pub reconcile: ReconcileOptions,
}

impl ApplyOptions {
    /// Merge command-line arguments over file settings.
    pub fn resolve(args: ApplyArgs, settings: &SlateSettings) -> Self {
        let attempts = args.lookup_attempts.unwrap_or(settings.lookup_attempts);
        let backoff = Duration::from_secs(args.backoff.unwrap_or(settings.backoff));
        let malformed_lines = if args.strict {
            MalformedLinePolicy::Reject
        } else {
            settings.malformed_lines
        };

        Self {
            changes_file: args.changes_file,
            token: args.token,
            api_base: args.api_base.unwrap_or_else(|| settings.api_base.clone()),
            reconcile: ReconcileOptions {
                root: args.root.unwrap_or_else(|| settings.root.clone()),
                provisioning: RetryPolicy::provisioning()
                    .with_attempts(attempts)
                    .with_backoff(backoff),
                malformed_lines,
            },
        }
    }
}

pub fn run(ctx: &Context, args: ApplyArgs, settings: &SlateSettings) -> Result<()> {
    let options = ApplyOptions::resolve(args, settings);
    let lines = read_change_list(&options.changes_file)
        .with_context(|| format!("Can't read change list {}", options.changes_file.display()))?;
    if lines.is_empty() && !ctx.quiet {
        ui::info("Change list is empty, nothing to apply");
    }
    log::info!(
        "Applying {} change entries against {}",
        lines.len(),
        options.api_base
    );

    let client = Client::new(&options.api_base, &options.token);
    let reconciler = Reconciler::new(client, options.reconcile);
    let mut signal = StdoutSignal::new();
    let summary = reconciler.run(&lines, &mut signal)?;

    if !ctx.quiet {
        report(&summary, ctx.verbose > 0);
    }
    Ok(())
}

fn report(summary: &RunSummary, per_entry: bool) {
    let entries = if per_entry { summary.entries.as_slice() } else { &[] };
    for (record, outcome) in entries {
        let path = record.as_ref().map_or("(unparsed entry)", |r| r.path.as_str());
        match outcome {
            Outcome::Created { id } => ui::success(&format!("{path}: created {id}")),
            Outcome::Updated { id } => ui::success(&format!("{path}: updated {id}")),
            Outcome::AlreadyProvisioned { id } => {
                ui::dim(&format!("{path}: already provisioned as {id}"));
            }
            Outcome::UpdateFailed { id, status } => {
                let status = status.map_or_else(|| "no response".to_string(), |s| s.to_string());
                ui::error(&format!("{path}: update of {id} failed ({status})"));
            }
            Outcome::DeletionUnsupported => {
                ui::warn(&format!("{path}: deleted, remote instance left running"));
            }
            Outcome::Skipped { reason } => ui::dim(&format!("{path}: skipped ({reason})")),
        }
    }

    ui::header("Summary");
    ui::kv("Created", &summary.created.to_string());
    ui::kv("Updated", &summary.updated.to_string());
    ui::kv("Unchanged", &summary.unchanged.to_string());
    ui::kv("Skipped", &summary.skipped.to_string());
    if summary.unsupported > 0 {
        ui::kv("Deletions ignored", &summary.unsupported.to_string());
    }
    if summary.failed > 0 {
        ui::kv("Failed updates", &summary.failed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ApplyArgs {
        ApplyArgs {
            changes_file: PathBuf::from("changed_files"),
            token: "tok".to_string(),
            api_base: None,
            root: None,
            lookup_attempts: None,
            backoff: None,
            strict: false,
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let options = ApplyOptions::resolve(args(), &SlateSettings::default());
        assert_eq!(options.api_base, slate::DEFAULT_API_BASE);
        assert_eq!(options.reconcile, ReconcileOptions::default());
    }

    #[test]
    fn test_resolve_overrides() {
        let settings = SlateSettings {
            backoff: 10,
            lookup_attempts: 4,
            ..SlateSettings::default()
        };
        let mut args = args();
        args.backoff = Some(1);
        args.api_base = Some("https://slate.example.org/v1alpha3".to_string());
        args.strict = true;

        let options = ApplyOptions::resolve(args, &settings);
        assert_eq!(options.api_base, "https://slate.example.org/v1alpha3");
        assert_eq!(options.reconcile.provisioning.max_attempts, 4);
        assert_eq!(options.reconcile.provisioning.backoff, Duration::from_secs(1));
        assert!(options.reconcile.provisioning.delay_first);
        assert_eq!(
            options.reconcile.malformed_lines,
            MalformedLinePolicy::Reject
        );
    }
}
