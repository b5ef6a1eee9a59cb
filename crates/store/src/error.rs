//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Note, block or folder does not exist
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Folder path contains invalid segments or escapes the root
    #[display("invalid folder path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// Host application could not be reached
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Host application rejected the request
    #[display("backend error: {_0}")]
    Backend(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Backend(_))
    }
}
