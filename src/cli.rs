use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slate-gitops")]
#[command(version)]
#[command(about = "Reconcile a configuration repository with the SLATE deployment API", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (defaults to slate-gitops.toml when present)
    #[arg(long, global = true, env = "SLATE_GITOPS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply a list of changed files to the deployment API
    Apply(ApplyArgs),

    /// Render the notification mail bodies for a commit
    MailBody(MailBodyArgs),

    /// Send the notification mail through Mailgun
    SendMail(SendMailArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    /// File listing changed paths, one "<status> <path>" per line
    pub changes_file: PathBuf,

    /// Deployment API access token
    #[arg(env = "SLATE_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Deployment API base URL
    #[arg(long, env = "SLATE_API_BASE")]
    pub api_base: Option<String>,

    /// Repository root that changed paths are relative to
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Instance lookups after a create response without an ID
    #[arg(long)]
    pub lookup_attempts: Option<u32>,

    /// Seconds to wait between instance lookups
    #[arg(long)]
    pub backoff: Option<u64>,

    /// Fail on malformed instance.yaml lines instead of skipping them
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct MailBodyArgs {
    /// Commit to summarize
    pub sha: String,

    /// Repository to read commits from (owner/name)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Directory holding email_template_text.hbs and email_template_html.hbs
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Directory to write text_body and html_body into
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Repository checkout used to resolve cluster names
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct SendMailArgs {
    /// HTML body to attach alongside MAILGUN_BODY
    #[arg(long)]
    pub html_file: Option<PathBuf>,
}
