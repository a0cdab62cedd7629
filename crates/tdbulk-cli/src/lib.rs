//! tdbulk CLI Library
//!
//! Command-line front end for the bulk-import pipeline.
//!
//! # Overview
//!
//! - **Import**: load a JSON-lines file into a table (`tdbulk import`)
//! - **Sessions**: inspect, resume or delete bulk-import sessions (`tdbulk session ...`)
//! - **Databases**: list databases visible to the API key (`tdbulk databases`)
//!
//! Settings come from a TOML file (`--config`), `TD_API_KEY`/`TD_API_SERVER`, and the
//! command-line flags, in increasing order of precedence.

pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod signal;
pub mod source;

// Re-export commonly used types
pub use config::FileConfig;
pub use error::{CliError, Result};
pub use source::JsonLinesSource;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tdbulk - bulk import into remote tables
#[derive(Parser, Debug)]
#[command(name = "tdbulk")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "TDBULK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, e.g. https://api.treasuredata.com
    #[arg(long, env = "TDBULK_SERVER_URL", global = true)]
    pub server_url: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a JSON-lines file through a bulk-import session
    Import(ImportArgs),

    /// Manage bulk-import sessions
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// List databases
    Databases {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    /// JSON-lines input file, one object per line
    pub input: PathBuf,

    /// Destination database (overrides the config file)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Destination table (overrides the config file)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Session name; reusing a name resumes that session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Append to the table or replace its contents
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Perform job priority (-2 to 2)
    #[arg(long, allow_hyphen_values = true)]
    pub priority: Option<i32>,

    /// Number of concurrent part uploads
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Abort on the first invalid record instead of skipping it
    #[arg(long)]
    pub stop_on_invalid_record: bool,

    /// Print the import report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Append,
    Replace,
}

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Show the remote state of a session
    Show {
        /// Session name
        name: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Drive an uploaded session through perform and commit
    Complete {
        /// Session name
        name: String,

        /// Perform job priority (-2 to 2)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        priority: i32,
    },

    /// Delete a session
    Delete {
        /// Session name
        name: String,
    },
}
