use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lp",
    about = "Liquid pledging: replay and verify pledge scenarios",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a scenario and print the resulting ledger
    Run(ScenarioArgs),
    /// Run a scenario, then check ledger invariants and vault reconciliation
    Verify(ScenarioArgs),
    /// Run a scenario and print the hash-chained journal
    Journal(ScenarioArgs),
    /// Print the default configuration as TOML
    Config,
}

#[derive(Args)]
pub struct ScenarioArgs {
    /// Scenario file (`.json` or `.toml`)
    pub scenario: PathBuf,
    /// Configuration file with `[ledger]` and `[vault]` tables
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
