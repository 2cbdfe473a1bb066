use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::Env;
use herald::{
    configuration::get_configuration,
    startup::{
        add_targets, analyze_targets, discover_targets, report_targets, submit_targets,
        triage_targets, verify_targets,
    },
};

#[derive(Parser)]
#[command(
    name = "herald",
    about = "Classify startup directories and auto-submit product listings"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a pasted tabular listing and merge new directories in
    Add {
        /// Text file with one "name TAB url TAB pricing" row per directory
        #[arg(long)]
        file: PathBuf,
    },
    /// Settle broken entries offline and build the browser work list
    Triage,
    /// Classify every entry over plain HTTP
    Analyze,
    /// Classify the work list with a rendering browser
    Verify {
        /// Re-scan active entries with unknown auth using the DOM probe
        #[arg(long)]
        deep: bool,
    },
    /// Map submission form fields on open-submission entries
    Discover,
    /// Fill and submit discovered forms
    Submit,
    /// Print the per-outcome summary
    Report,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let configuration = get_configuration().expect("Failed to read configuration.");

    match cli.command {
        Command::Add { file } => add_targets(&configuration, &file).await,
        Command::Triage => triage_targets(&configuration).await,
        Command::Analyze => analyze_targets(&configuration).await,
        Command::Verify { deep } => verify_targets(&configuration, deep).await,
        Command::Discover => discover_targets(&configuration).await,
        Command::Submit => submit_targets(&configuration).await,
        Command::Report => report_targets(&configuration).await,
    }
}
