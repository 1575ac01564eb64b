//! CLI argument parsing structures.

use clap::{Args, Parser};
use std::path::PathBuf;

use super::commands::Commands;

/// Main CLI structure for mprof.
#[derive(Parser, Debug)]
#[command(name = "mprof")]
#[command(about = "Manage encrypted MongoDB connection profiles", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global configuration arguments available to all commands.
#[derive(Debug, Default, Args)]
pub struct ConfigArgs {
    /// Directory holding profiles.json and settings.kdl (overrides MPROF_CONFIG_DIR)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
}
