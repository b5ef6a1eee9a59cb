//! Bibliographic entry model.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// CSL-JSON member holding the user-facing citekey (preferred over `id`).
const CSL_CITEKEY: &str = "citation-key";
const CSL_ID: &str = "id";

/// One bibliographic record, as fetched from a [`DataSource`](crate::DataSource).
///
/// Fields are kept as loosely-typed JSON values since every source carries
/// its own set (CSL-JSON names, Zotero item fields, ...). Entries are
/// immutable snapshots; re-fetch to observe changes.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteratureEntry {
    /// Stable identifier of the record, unique within its source.
    pub citekey: String,
    pub fields: BTreeMap<String, Value>,
}
impl LiteratureEntry {
    pub fn new(citekey: impl Into<String>) -> Self {
        Self {
            citekey: citekey.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Build an entry from a single CSL-JSON item object.
    ///
    /// The citekey is taken from `citation-key` when present, falling back to
    /// `id` (strings and numbers are both accepted). `position` is only used
    /// for error reporting.
    pub(crate) fn from_csl(position: usize, item: Map<String, Value>) -> Result<Self> {
        let citekey = [CSL_CITEKEY, CSL_ID]
            .iter()
            .filter_map(|key| match item.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .next()
            .ok_or_raise(|| ErrorKind::MissingCitekey(position))?;
        Ok(Self {
            citekey,
            fields: item.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    #[test]
    fn test_citation_key_preferred_over_id() {
        let item = object(json!({"id": "http://zotero.org/items/ABCD", "citation-key": "doe2020", "title": "T"}));
        let entry = LiteratureEntry::from_csl(0, item).unwrap();
        assert_eq!(entry.citekey, "doe2020");
        assert_eq!(entry.get("title"), Some(&json!("T")));
    }

    #[test]
    fn test_numeric_id() {
        let entry = LiteratureEntry::from_csl(0, object(json!({"id": 42}))).unwrap();
        assert_eq!(entry.citekey, "42");
    }

    #[test]
    fn test_missing_citekey() {
        let err = LiteratureEntry::from_csl(3, object(json!({"title": "Untitled", "id": "  "}))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingCitekey(3)));
    }

    #[test]
    fn test_builder() {
        let entry = LiteratureEntry::new("doe2020").with_field("year", 2020);
        assert_eq!(entry.get("year"), Some(&json!(2020)));
        assert_eq!(entry.get("missing"), None);
    }
}
