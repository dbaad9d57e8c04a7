//! ejwatch: ATM electronic-journal watcher.
//!
//! # Usage
//!
//! ```text
//! ejwatch run [--config ejwatch.yaml]
//! ejwatch status [--config ejwatch.yaml] [--json]
//! ejwatch resolve [--config ejwatch.yaml]
//! ejwatch convert-table <CSV> <JSON>
//! ejwatch simulate --path <FILE> [--duration-secs N] [--max-entries N]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    convert::ConvertArgs, resolve::ResolveArgs, run::RunArgs, simulate::SimulateArgs,
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ejwatch",
    version,
    about = "Copy an ATM electronic journal into per-day, per-terminal files",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the journal until stopped (ctrl-c / SIGTERM).
    Run(RunArgs),

    /// Show the resolved terminal, rollover state and today's destination.
    Status(StatusArgs),

    /// Print the probed host address and the terminal id it maps to.
    Resolve(ResolveArgs),

    /// Convert an `ip,terminal_id` CSV table into the JSON table format.
    ConvertTable(ConvertArgs),

    /// Append synthetic journal entries to a file, for testing.
    Simulate(SimulateArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Resolve(args) => args.run(),
        Commands::ConvertTable(args) => args.run(),
        Commands::Simulate(args) => args.run(),
    }
}
