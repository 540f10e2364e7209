//! HEXTAC CLI - Command-line interface
//!
//! Commands:
//! - simulate: Run a scripted battle against the greedy AI
//! - shape: Print disk, ring or line coordinates

mod shape_cmd;
mod simulate_cmd;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hextac")]
#[command(about = "HEXTAC hex tactics simulation")]
struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. "debug", "hextac_core=trace")
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a battle with both sides driven by the greedy AI
    Simulate(simulate_cmd::SimulateArgs),
    /// Print hex shapes
    Shape(shape_cmd::ShapeArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --log-level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate(args) => simulate_cmd::run(args),
        Commands::Shape(args) => shape_cmd::run(args),
    }
}
