mod cli;
mod commands;
mod settings;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use settings::Settings;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

/// `DEBUG=TRUE` in the environment forces debug logging.
fn debug_requested() -> bool {
    std::env::var("DEBUG").is_ok_and(|value| value.eq_ignore_ascii_case("true"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else if debug_requested() {
            log_level.max(log::LevelFilter::Debug)
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Apply(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            commands::apply::run(&ctx, args, &settings.slate)
        }
        Command::MailBody(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            commands::mail_body::run(&ctx, args, &settings.notify)
        }
        Command::SendMail(args) => commands::send_mail::run(&ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "slate-gitops", &mut io::stdout());
            Ok(())
        }
    }
}
