//! Citation Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Failures from the data source and the
//! note store are raised into [`ErrorKind::Source`] and [`ErrorKind::Store`],
//! keeping the adapter's own error as the child of the tree.

use derive_more::{Display, Error};

/// A citation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for citation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a citation failure.
///
/// ### Operational Errors
/// - [`ErrorKind::LiteratureNotFound`]
/// - [`ErrorKind::PathResolution`]
/// - [`ErrorKind::Template`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Source`]
/// - [`ErrorKind::Store`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The data source has no entry for the citekey.
    #[display("no literature entry for citekey {_0}")]
    LiteratureNotFound(#[error(not(source))] String),
    /// The reference folder could not be located in the note store.
    #[display("reference folder not found: {_0}")]
    PathResolution(#[error(not(source))] String),
    /// A template failed to compile or render.
    #[display("template failed to compile or render")]
    Template,
    /// The bibliographic data source failed.
    #[display("data source failure")]
    Source,
    /// The host note store failed.
    #[display("note store failure")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Adapter failures are reported as retryable; inspect the child error
    /// for the precise reason.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source | Self::Store)
    }
}
