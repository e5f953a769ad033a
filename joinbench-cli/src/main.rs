//! Joinbench CLI - add-member latency experiments.
//!
//! ```bash
//! joinbench run --cluster http://a1:7000,http://a2:7000 --cluster http://b1:7000 --threads 4
//! joinbench discover --config joinbench.toml
//! ```
//!
//! See `joinbench --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{ClusterArgs, RunArgs};

#[derive(Parser)]
#[command(
    name = "joinbench",
    about = "Measure write latency across an add-member reconfiguration",
    version
)]
struct Cli {
    /// Config file (default: joinbench.toml, skipped when absent)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the experiment and write the report
    Run(RunArgs),
    /// Probe every endpoint and print the topology, without generating load
    Discover(ClusterArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(cli.config.as_deref(), args).await,
        Commands::Discover(args) => commands::discover::run(cli.config.as_deref(), args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
