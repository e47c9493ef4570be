//! Output handler traits and error types
//!
//! This module defines the trait interface for record writers.

use crate::state::RecordMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to read records from {path}: {message}")]
    Format { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Durable destination for harvested records
///
/// Writers are called from the crawl engine's control loop at every checkpoint and once
/// at completion. Each write replaces the full record set.
pub trait OutputHandler: Send + Sync {
    /// Replaces the stored record set with `records`
    fn write_records(&self, records: &RecordMap) -> OutputResult<()>;

    /// Loads records written by a previous run
    ///
    /// Returns `Ok(None)` if nothing has been written yet.
    fn load_records(&self) -> OutputResult<Option<RecordMap>>;

    /// Human readable destination, used in log lines
    fn describe(&self) -> String;
}
