use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ALIE - a resumable, phase-aware Arch Linux install orchestrator
#[derive(Parser)]
#[command(name = "alie")]
#[command(about = "Resolves and runs the next Arch Linux installation step")]
#[command(version)]
pub struct Cli {
    /// Pick a step from the full menu instead of automatic resolution
    #[arg(short, long)]
    pub manual: bool,

    /// Path to a resolver configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the detected environment and recorded progress
    Status,
    /// Erase all recorded progress
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
