//! `slate-gitops send-mail`: deliver the change mail through Mailgun.

use crate::Context;
use crate::cli::SendMailArgs;
use anyhow::{Context as _, Result};
use changemail::{MailTransport, MailgunConfig, MailgunTransport, deliver};
use std::fs;
use std::path::Path;

pub fn run(ctx: &Context, args: SendMailArgs) -> Result<()> {
    let config = MailgunConfig::from_env()?;
    send(ctx, &MailgunTransport::new(), &config, args.html_file.as_deref())
}

fn send(
    ctx: &Context,
    transport: &dyn MailTransport,
    config: &MailgunConfig,
    html_file: Option<&Path>,
) -> Result<()> {
    let html = html_file
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("Can't read {}", path.display()))
        })
        .transpose()?;

    deliver(transport, config, html)?;
    if !ctx.quiet {
        println!("Sent email through mailgun");
    }
    Ok(())
}
