//! CLI module
//!
//! Command-line interface for running sync jobs.
//!
//! # Commands
//!
//! - `run` - Sync one spreadsheet for one tenant
//! - `ranges` - List the ranges a spreadsheet exposes
//! - `tables` - List the registered tables
//! - `last-sync` - Show a tenant's last successful sync
//! - `serve` - Start HTTP server mode

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
pub use server::{router, serve, Schedule, ServerConfig};
