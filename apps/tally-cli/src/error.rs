//! # CLI Error Type
//!
//! Unified error type for the `tally` binary.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError ──┐                                                          │
//! │  DbError ────┼──► AppError ──► stderr ("error: ...")  + exit code 1     │
//! │  ReportError ┘        │                                                 │
//! │                       └──► ErrorReport {code, message}  (--json)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::{CoreError, ErrorKind};
use tally_db::DbError;
use tally_report::ReportError;
use thiserror::Error;

/// Anything a `tally` command can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Report(#[from] ReportError),

    /// Bad command-line input that clap could not catch.
    #[error("Invalid argument: {0}")]
    Usage(String),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn usage(message: impl Into<String>) -> Self {
        AppError::Usage(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Core(err) => err.kind(),
            AppError::Db(err) => err.kind(),
            AppError::Report(err) => err.kind(),
            AppError::Usage(_) => ErrorKind::Validation,
            AppError::Output(_) | AppError::Io(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// Machine-readable failure printed in `--json` mode.
///
/// ```json
/// { "code": "insufficient_stock", "message": "Insufficient stock for ..." }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: ErrorKind,
    pub message: String,
}

impl From<&AppError> for ErrorReport {
    fn from(err: &AppError) -> Self {
        ErrorReport {
            code: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations.
pub type AppResult<T> = Result<T, AppError>;
