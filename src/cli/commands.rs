//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SheetSync CLI
#[derive(Parser, Debug)]
#[command(name = "sheetsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sync job
    Run {
        /// Spreadsheet id
        #[arg(long)]
        spreadsheet: Option<String>,

        /// Tenant owning the written rows
        #[arg(long)]
        tenant: String,

        /// Read ranges from a JSON fixture instead of the Sheets API
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Tables to sync (comma-separated, empty = all)
        #[arg(long)]
        tables: Option<String>,
    },

    /// List the ranges a spreadsheet exposes
    Ranges {
        /// Spreadsheet id
        #[arg(long)]
        spreadsheet: Option<String>,

        /// Read ranges from a JSON fixture instead of the Sheets API
        #[arg(long)]
        fixture: Option<PathBuf>,
    },

    /// List the registered tables
    Tables,

    /// Show when a tenant last synced successfully
    LastSync {
        /// Tenant to look up
        #[arg(long)]
        tenant: String,
    },

    /// Start HTTP server mode
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Run a scheduled job every N seconds
        #[arg(long)]
        every: Option<u64>,

        /// Spreadsheet for the scheduled job
        #[arg(long, requires = "every")]
        spreadsheet: Option<String>,

        /// Tenant for the scheduled job
        #[arg(long, requires = "every")]
        tenant: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON (one message per line)
    Json,
    /// Indented JSON
    Pretty,
}
