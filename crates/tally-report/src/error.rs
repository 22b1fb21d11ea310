//! # Report Error Types

use chrono::NaiveDate;
use tally_core::ErrorKind;
use thiserror::Error;

/// Failures reading or writing report files.
#[derive(Debug, Error)]
pub enum ReportError {
    /// No report file exists for the date.
    #[error("No report found for {0}")]
    NotFound(NaiveDate),

    #[error("Report I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The report file exists but is not a valid document.
    #[error("Report document is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::PersistenceFailure,
        }
    }
}

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;
