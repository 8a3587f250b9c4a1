//! Structured error kinds shared across the pipeline.
//!
//! Scanning and hashing failures are rarely fatal (spec: "no error during
//! scanning or hashing is fatal") so most of these variants end up carried
//! inside a [`crate::progress::ProgressEvent::Warning`] or a delete-outcome
//! failure list rather than propagated as an `Err`. [`UsageError`],
//! [`Cancelled`] and [`CorruptedResult`] are the ones that do get returned.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum DuplicateFinderError {
    /// Invalid CLI arguments or filter configuration; nothing ran.
    #[error("usage error: {0}")]
    UsageError(String),

    /// A single path could not be scanned (permission denied, stat failure).
    #[error("scan warning at {path}: {message}")]
    ScanWarning { path: PathBuf, message: String },

    /// A read failure during a hashing stage; the file is demoted to a singleton.
    #[error("failed to hash {path}: {message}")]
    HashError { path: PathBuf, message: String },

    /// A trash-move failure during keep-one execution.
    #[error("failed to move {path} to trash: {message}")]
    DeleteError { path: PathBuf, message: String },

    /// The stop flag was observed; a partial result was returned.
    #[error("operation cancelled")]
    Cancelled,

    /// A saved result failed to load: bad JSON or an unsupported schema version.
    #[error("corrupted result: {0}")]
    CorruptedResult(String),
}
