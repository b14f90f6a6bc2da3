// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # SheetSync
//!
//! Batch synchronization of a spreadsheet's named ranges into a relational
//! store, scoped to one tenant per job.
//!
//! ## Features
//!
//! - **One fetch per job**: every range in a single batch request, with a
//!   per-range fallback that isolates broken ranges
//! - **Typed row transforms**: currency, date and percentage parsing that
//!   fails closed on malformed rows
//! - **Write strategies**: upsert, stale-sibling cleanup, replace,
//!   flag-preserving replace and paginated replace
//! - **Pluggable stores**: PostgREST-compatible REST, DuckDB, in-memory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetsync::config::Settings;
//! use sheetsync::engine::{run_job, JobParams};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::load(Some("sheetsync.yaml".as_ref())).unwrap();
//!     let params = JobParams::new("1AbC...", "user-42");
//!
//!     match run_job(&settings, &params, None).await {
//!         Ok(result) => println!("{}", serde_json::to_string(&result).unwrap()),
//!         Err(failure) => eprintln!("{failure}"),
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     run_job / SyncEngine                      │
//! │   pre-flight → fetch once → dispatch tables → JobResult       │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬──────────────┬───┴─────────┬─────────────┬────────┐
//! │  Source   │    Fetch     │  Transform  │   Writer    │ Store  │
//! ├───────────┼──────────────┼─────────────┼─────────────┼────────┤
//! │ Sheets v4 │ Batch tier   │ Amounts     │ Upsert      │ REST   │
//! │ Fixture   │ Per-range    │ Dates       │ Replace     │ DuckDB │
//! │           │ fallback     │ Percentages │ Paginated   │ Memory │
//! └───────────┴──────────────┴─────────────┴─────────────┴────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for SheetSync
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Spreadsheet sources
pub mod source;

/// Relational stores
pub mod store;

/// Cell parsers and per-table row transforms
pub mod transform;

/// Range to table registry
pub mod registry;

/// Single-fetch range retrieval
pub mod fetch;

/// Write strategy executors
pub mod writer;

/// Last-sync bookkeeping
pub mod bookkeeping;

/// Sync orchestration
pub mod engine;

/// Settings loading
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, FailureKind, Result};
pub use types::*;

// Re-export commonly used types
pub use engine::{run_job, JobFailure, JobParams, JobResult, SyncEngine};
pub use writer::SyncOutcome;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
