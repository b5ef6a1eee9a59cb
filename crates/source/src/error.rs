//! Data Source Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A data source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for data source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Library file could not be read
    #[display("I/O error reading {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Library content is not valid CSL-JSON
    #[display("invalid CSL-JSON: {_0}")]
    Parse(#[error(not(source))] String),
    /// An entry carries neither a `citation-key` nor an `id`
    #[display("entry #{_0} has no citekey")]
    MissingCitekey(#[error(not(source))] usize),
    /// Library file format is not handled by this adapter
    #[display("unsupported library format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// No library is configured to read entries from
    #[display("no library files configured")]
    NotConfigured,
    /// Live-service specific error
    #[display("backend error: {_0}")]
    Backend(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Backend(_))
    }
}
