//! CLI definition for the orchestrator binary.

use std::path::PathBuf;

use clap::Parser;

/// Command-line interface for the Aksharamala dev-environment orchestrator.
///
/// No subcommands: the tool does one thing — free the dev ports, start both
/// servers, and tear them down on interrupt.
#[derive(Debug, Parser)]
#[command(name = "aks-dev")]
#[command(about = "Run the Aksharamala development servers")]
#[command(version)]
pub struct Cli {
    /// Project root containing the Go backend and the web/ frontend
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Override the backend port (otherwise taken from VITE_API_BASE_URL)
    #[arg(long)]
    pub backend_port: Option<u16>,

    /// Reclaim attempts per port before giving up
    #[arg(long, default_value_t = 5)]
    pub retries: u32,

    /// Settling delay between kill and re-probe, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub settle_ms: u64,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
