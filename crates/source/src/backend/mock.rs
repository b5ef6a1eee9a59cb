//! In-memory data source for testing.

use crate::DataSource;
use crate::error::{ErrorKind, Result};
use crate::models::LiteratureEntry;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory data source for testing.
///
/// Entries can be replaced while the source is shared (to simulate the user
/// editing their library), and individual citekeys can be made to fail to
/// exercise adapter errors.
pub struct MockSource {
    name: String,
    entries: RwLock<BTreeMap<String, LiteratureEntry>>,
    failing: BTreeSet<String>,
    fetches: AtomicUsize,
}
impl MockSource {
    /// Create a mock source pre-populated with entries.
    pub fn with_entries(entries: impl IntoIterator<Item = LiteratureEntry>) -> Self {
        Self {
            name: "mock".to_string(),
            entries: RwLock::new(entries.into_iter().map(|e| (e.citekey.clone(), e)).collect()),
            failing: BTreeSet::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Make every fetch of `citekey` fail with a backend error.
    pub fn with_failing(mut self, citekey: impl Into<String>) -> Self {
        self.failing.insert(citekey.into());
        self
    }

    /// Insert or replace an entry.
    pub async fn upsert(&self, entry: LiteratureEntry) {
        self.entries.write().await.insert(entry.citekey.clone(), entry);
    }

    /// Number of [`entry`](DataSource::entry) calls made so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}
impl Default for MockSource {
    fn default() -> Self {
        let entries: [LiteratureEntry; 0] = [];
        Self::with_entries(entries)
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_citekeys(&self) -> Result<BTreeSet<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn entry(&self, citekey: &str) -> Result<Option<LiteratureEntry>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(citekey) {
            exn::bail!(ErrorKind::Backend(format!("fetch rejected for {citekey}")));
        }
        Ok(self.entries.read().await.get(citekey).cloned())
    }
}
