//! Data source trait and implementations.
//!
//! A data source is anything that can enumerate citekeys and hand out the
//! entry behind each of them: flat library files exported by a reference
//! manager, or a live reference manager instance. Consumers only ever talk to
//! the [`DataSource`] trait and never branch on which variant is configured.

mod file;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::file::FileSource;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockSource;
use crate::error::Result;
use crate::models::LiteratureEntry;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Unified interface for bibliographic data sources.
///
/// # Examples
///
/// ```
/// use bibnote_source::{DataSource, error::Result};
///
/// async fn titles(source: &dyn DataSource) -> Result<Vec<String>> {
///     let mut titles = Vec::new();
///     for citekey in source.list_citekeys().await? {
///         if let Some(entry) = source.entry(&citekey).await? {
///             titles.push(entry.get("title").and_then(|t| t.as_str()).unwrap_or_default().to_string());
///         }
///     }
///     Ok(titles)
/// }
/// ```
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Name of the configured source (used for logging only).
    fn name(&self) -> &str;

    /// Every citekey currently known to the source.
    async fn list_citekeys(&self) -> Result<BTreeSet<String>>;

    /// Fetch the entry for `citekey`, or `None` if the source doesn't know it.
    ///
    /// An unknown citekey is **not** an error; errors are reserved for the
    /// source itself failing.
    async fn entry(&self, citekey: &str) -> Result<Option<LiteratureEntry>>;
}
