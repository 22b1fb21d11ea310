//! # Tally POS CLI
//!
//! Library half of the `tally` binary: configuration, the register that
//! ties checkout to the daily report, and the CLI error type.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. init_tracing()          RUST_LOG or "info,tally=debug,sqlx=warn"    │
//! │  2. AppConfig::from_env()   TALLY_* variables over defaults             │
//! │  3. Database::new()         open SQLite, run migrations                 │
//! │  4. ReportAggregator::open  reports directory                           │
//! │  5. run the subcommand                                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod register;

use tracing_subscriber::EnvFilter;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorReport};
pub use register::{Register, SaleOutcome};

/// Initializes the tracing subscriber for logging.
///
/// Logs go to stderr so command output on stdout stays pipeable.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Show trace for tally crates only
/// - Default: INFO level, debug for tally crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
