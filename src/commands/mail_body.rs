//! `slate-gitops mail-body`: render `text_body` and `html_body` for a commit.

use crate::Context;
use crate::cli::MailBodyArgs;
use crate::settings::NotifySettings;
use crate::ui;
use anyhow::{Context as _, Result};
use changemail::{GitHubSource, Templates, compose};
use std::path::Path;

pub fn run(ctx: &Context, args: MailBodyArgs, settings: &NotifySettings) -> Result<()> {
    let repo = args.repo.unwrap_or_else(|| settings.repo.clone());
    let source =
        GitHubSource::with_api_base(&settings.github_api, repo).with_token(args.github_token);

    let templates = match args.templates.as_ref().or(settings.templates.as_ref()) {
        Some(dir) => Templates::from_dir(dir)
            .with_context(|| format!("Can't load templates from {}", dir.display()))?,
        None => Templates::builtin()?,
    };

    let root = args.root.unwrap_or_else(|| Path::new(".").to_path_buf());
    let mail = compose(&source, &args.sha, &root, &templates, settings.history_depth)
        .with_context(|| format!("Can't build change mail for {}", args.sha))?;

    let output = args.output.unwrap_or_else(|| settings.output.clone());
    let (text, html) = mail.write_to(&output)?;

    if !ctx.quiet {
        ui::success(&format!("Mail bodies written for {} in {}", args.sha, source.repo()));
        ui::kv("text", &text.display().to_string());
        ui::kv("html", &html.display().to_string());
    }
    Ok(())
}
