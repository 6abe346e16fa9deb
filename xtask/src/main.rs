// Desktop/tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod doc;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Acquisition pipeline development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check host builds, no_std target builds, lints and formatting
    Check,
    /// Run unit, integration and doc tests
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
        /// Build the drivers with `tracing` logs (set RUST_LOG to see them)
        #[arg(long)]
        tracing: bool,
    },
    /// Document the library crates, failing on broken doc links
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
        /// Document the bare-metal API (defmt on, simulated hardware off)
        #[arg(long)]
        target: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => check::run(),
        Commands::Test {
            unit,
            integration,
            tracing,
        } => test::run(unit, integration, tracing),
        Commands::Doc { open, target } => doc::run(open, target),
    }
}
