//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Rehearse script lines with a scene partner that reads the other parts.
#[derive(Parser)]
#[command(name = "rehearse")]
#[command(about = "Rehearse script lines against a spoken scene partner")]
#[command(version)]
pub struct Cli {
    /// Directory holding the progress database
    #[arg(long = "data-dir", env = "REHEARSE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Bearer token for the remote progress service
    #[arg(
        long = "sync-token",
        env = "REHEARSE_SYNC_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub sync_token: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
