mod cli;
mod commands;
mod config;
mod engine;
mod progress;
mod runner;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
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
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let config = cli.config.as_deref();

    match cli.command {
        Command::Status(args) => commands::sources::status(&ctx, config, args.json),
        Command::Diff(args) => commands::sources::diff(&ctx, config, args.target.as_deref()),
        Command::Apply(args) => commands::sources::apply(
            &ctx,
            config,
            args.target.as_deref(),
            args.dry_run,
            args.yes,
        ),
        Command::Validate => commands::config::validate(&ctx, config),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sumo-source", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print an error chain, with advice for API errors
fn report(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));

    if let Some(source) = err.downcast_ref::<sumokit::Error>() {
        let category = source.category();
        eprintln!();
        eprintln!("  {}: {}", category, category.advice());
    }
}
