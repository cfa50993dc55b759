use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sumo-source")]
#[command(version)]
#[command(about = "Declarative management of Sumo Logic collector log sources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/sumo-source/config.toml)
    #[arg(short, long, global = true, env = "SUMO_SOURCE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the collector and how each declared source compares to it
    Status(StatusArgs),

    /// Preview what apply would change
    Diff(TargetArgs),

    /// Make the collector's sources match the config
    Apply(ApplyArgs),

    /// Check the config file without contacting the API
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct StatusArgs {
    /// Print the collector view as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct TargetArgs {
    /// Only sources matching this target (e.g. "sumo_source.app-logs" or "app")
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only sources matching this target (e.g. "sumo_source.app-logs" or "app")
    pub target: Option<String>,

    /// Show what would change without calling the API's mutating endpoints
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
