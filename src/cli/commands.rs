//! Command and subcommand definitions.

use clap::Subcommand;
use std::path::PathBuf;

/// Top-level commands available in mprof.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all profiles
    List,
    /// Show one profile (connection string credentials are masked)
    Show {
        /// Profile name
        name: String,
    },
    /// Add a profile
    Add {
        /// Profile name (letters, digits, '_' and '-')
        name: String,

        /// Connection string, or bare host:port
        uri: String,

        /// Default database
        #[arg(short, long)]
        database: Option<String>,

        /// Short display alias
        #[arg(short, long)]
        alias: Option<String>,

        /// Tag, may be repeated
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Environment (development, staging, production, testing, local, or any label)
        #[arg(short, long)]
        env: Option<String>,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },
    /// Remove a profile
    Remove {
        /// Profile name
        name: String,
    },
    /// Show the default profile, or set it
    Default {
        /// Profile to make the default
        name: Option<String>,
    },
    /// Test connectivity (uses the default profile when no name is given)
    Test {
        /// Profile name
        name: Option<String>,

        /// Test every profile concurrently
        #[arg(short, long, conflicts_with = "name")]
        all: bool,
    },
    /// Connect and list databases
    Databases {
        /// Profile name (default profile when omitted)
        name: Option<String>,

        /// Also list each database's collections
        #[arg(short, long)]
        collections: bool,
    },
    /// Write all profiles (still encrypted) as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Import profiles from an export file
    Import {
        /// File produced by `mprof export`
        file: PathBuf,
    },
    /// Manage mprof configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a settings.kdl with the default values
    Generate {
        /// Overwrite an existing settings file
        #[arg(long)]
        overwrite: bool,
    },
    /// Show where configuration lives
    Show,
}
