//! Library file data source.
//!
//! Loads entries exported by a reference manager as CSL-JSON. The whole
//! library is read into memory once; call [`FileSource::load`] again to pick
//! up changes on disk.

use crate::DataSource;
use crate::error::{ErrorKind, Result};
use crate::models::LiteratureEntry;
use async_trait::async_trait;
use bibnote_config::SourceConfig;
use exn::ResultExt;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::instrument;

/// CSL-JSON library files.
///
/// When several files define the same citekey, the file loaded last wins.
///
/// # Examples
///
/// ```
/// use bibnote_source::backend::FileSource;
///
/// let source = FileSource::from_json("inline", r#"[{"id": "doe2020", "title": "On Things"}]"#).unwrap();
/// assert_eq!(source.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    entries: BTreeMap<String, LiteratureEntry>,
}
impl FileSource {
    /// Read and merge every library file in `paths`.
    ///
    /// Only CSL-JSON (`.json`) is understood. Other formats (including BibTeX)
    /// return [`ErrorKind::UnsupportedFormat`] instead of being skipped, so a
    /// misconfigured library is noticed immediately.
    #[instrument(skip_all)]
    pub async fn load(name: impl Into<String>, paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<Self> {
        let mut source = Self {
            name: name.into(),
            entries: BTreeMap::new(),
        };
        for path in paths {
            let path = path.as_ref();
            if !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
                exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf()));
            }
            let bytes = tokio::fs::read(path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
            let loaded = source.merge(&bytes)?;
            tracing::debug!(source = %source.name, path = %path.display(), entries = loaded, "Loaded library file");
        }
        Ok(source)
    }

    /// Load the library files listed in the configuration.
    ///
    /// Returns [`ErrorKind::NotConfigured`] when no file is listed, since a
    /// source without a library can't cite anything.
    pub async fn from_config(config: &SourceConfig) -> Result<Self> {
        if config.paths.is_empty() {
            exn::bail!(ErrorKind::NotConfigured);
        }
        Self::load("files", &config.paths).await
    }

    /// Build a source from an in-memory CSL-JSON document.
    pub fn from_json(name: impl Into<String>, json: impl AsRef<[u8]>) -> Result<Self> {
        let mut source = Self {
            name: name.into(),
            entries: BTreeMap::new(),
        };
        source.merge(json.as_ref())?;
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a CSL-JSON document (an array of item objects) into the source,
    /// returning how many entries it contained.
    fn merge(&mut self, bytes: &[u8]) -> Result<usize> {
        let document: Value =
            serde_json::from_slice(bytes).or_raise(|| ErrorKind::Parse("document is not valid JSON".to_string()))?;
        let Value::Array(items) = document else {
            exn::bail!(ErrorKind::Parse("expected an array of items".to_string()));
        };
        let count = items.len();
        for (position, item) in items.into_iter().enumerate() {
            let Value::Object(item) = item else {
                exn::bail!(ErrorKind::Parse(format!("item #{position} is not an object")));
            };
            let entry = LiteratureEntry::from_csl(position, item)?;
            if let Some(previous) = self.entries.insert(entry.citekey.clone(), entry) {
                tracing::warn!(citekey = %previous.citekey, "Duplicate citekey in library; later entry wins");
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_citekeys(&self) -> Result<BTreeSet<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    async fn entry(&self, citekey: &str) -> Result<Option<LiteratureEntry>> {
        Ok(self.entries.get(citekey).cloned())
    }
}
