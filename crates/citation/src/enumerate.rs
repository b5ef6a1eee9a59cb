//! Ordering of the literature cited by a document.

use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::index::CitekeyIndex;
use bibnote_store::NoteId;
use exn::ResultExt;
use memchr::memmem;
use std::collections::BTreeSet;
use tracing::instrument;

/// Literature notes cited by a document, in order of first appearance.
///
/// The position of a note in the enumeration is its citation **index**
/// (0-based). Enumerations are cheap, recomputed per call and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteratureEnum {
    note_ids: Vec<NoteId>,
}
impl LiteratureEnum {
    /// Citation index of `note_id`, or `None` if the document doesn't cite it.
    pub fn index_of(&self, note_id: &str) -> Option<usize> {
        self.note_ids.iter().position(|id| id == note_id)
    }

    pub fn len(&self) -> usize {
        self.note_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.note_ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteId> {
        self.note_ids.iter()
    }
}

/// Order the literature notes of `known_citekeys` by where they first appear
/// in `content`.
///
/// Citekeys without a registered note, or whose note id never appears in
/// `content`, are left out. Ties keep the order of `known_citekeys`.
///
/// # Examples
///
/// ```
/// use bibnote_citation::{CitekeyIndex, enumerate};
///
/// let index = CitekeyIndex::default();
/// index.register("a2020", "note-a");
/// index.register("b2021", "note-b");
/// let literature = enumerate(&index, r#"((note-b "[1]")) then ((note-a "[2]"))"#, ["a2020", "b2021"]);
/// assert_eq!(literature.index_of("note-b"), Some(0));
/// assert_eq!(literature.index_of("note-a"), Some(1));
/// ```
pub fn enumerate<'a>(
    index: &CitekeyIndex,
    content: &str,
    known_citekeys: impl IntoIterator<Item = &'a str>,
) -> LiteratureEnum {
    let mut seen = BTreeSet::new();
    let mut found: Vec<(usize, NoteId)> = known_citekeys
        .into_iter()
        .filter_map(|citekey| index.lookup(citekey))
        .filter(|note_id| !note_id.is_empty() && seen.insert(note_id.clone()))
        .filter_map(|note_id| memmem::find(content.as_bytes(), note_id.as_bytes()).map(|offset| (offset, note_id)))
        .collect();
    // Stable, so equal offsets keep the input order.
    found.sort_by_key(|(offset, _)| *offset);
    LiteratureEnum {
        note_ids: found.into_iter().map(|(_, note_id)| note_id).collect(),
    }
}

/// Read `document` from the store and enumerate the literature it cites,
/// considering every citekey the data source knows.
#[instrument(skip_all, fields(document = %document))]
pub async fn enumerate_document(ctx: &Context, document: &NoteId) -> Result<LiteratureEnum> {
    let content = ctx.store.read_block(document).await.or_raise(|| ErrorKind::Store)?;
    let citekeys = ctx.source.list_citekeys().await.or_raise(|| ErrorKind::Source)?;
    let literature = enumerate(&ctx.index, &content, citekeys.iter().map(String::as_str));
    tracing::debug!(cited = literature.len(), "Enumerated literature");
    Ok(literature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use bibnote_source::LiteratureEntry;
    use bibnote_source::backend::MockSource;
    use bibnote_store::backend::MockStore;
    use rstest::rstest;

    fn index(pairs: &[(&str, &str)]) -> CitekeyIndex {
        let index = CitekeyIndex::default();
        for (citekey, note_id) in pairs {
            index.register(*citekey, *note_id);
        }
        index
    }

    #[test]
    fn test_orders_by_first_occurrence() {
        let index = index(&[("a", "id-a"), ("b", "id-b")]);
        let content = format!("{}((id-b \"x\")){}((id-a \"y\"))", " ".repeat(8), " ".repeat(28));
        assert_eq!(content.find("id-a"), Some(50));
        assert_eq!(content.find("id-b"), Some(10));
        let literature = enumerate(&index, &content, ["a", "b"]);
        assert_eq!(literature.iter().collect::<Vec<_>>(), vec!["id-b", "id-a"]);
    }

    #[rstest]
    #[case(["a", "ab"], vec!["id-a", "id-ab"])]
    #[case(["ab", "a"], vec!["id-ab", "id-a"])]
    fn test_equal_offsets_keep_citekey_order(#[case] citekeys: [&str; 2], #[case] expected: Vec<&str>) {
        // `id-a` is a prefix of `id-ab`, so both are first found at offset 2.
        let index = index(&[("a", "id-a"), ("ab", "id-ab")]);
        let literature = enumerate(&index, "x id-ab", citekeys);
        assert_eq!(literature.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_skips_unregistered_and_absent() {
        let index = index(&[("a", "id-a"), ("b", "id-b")]);
        let literature = enumerate(&index, "((id-a \"1\"))", ["a", "b", "unregistered"]);
        assert_eq!(literature.len(), 1);
        assert_eq!(literature.index_of("id-b"), None);
    }

    #[test]
    fn test_duplicate_citekeys_counted_once() {
        let index = index(&[("a", "id-a")]);
        let literature = enumerate(&index, "id-a id-a", ["a", "a"]);
        assert_eq!(literature.len(), 1);
    }

    #[test]
    fn test_empty_content() {
        let index = index(&[("a", "id-a")]);
        assert!(enumerate(&index, "", ["a"]).is_empty());
    }

    #[tokio::test]
    async fn test_enumerate_document() {
        let source = MockSource::with_entries([LiteratureEntry::new("a"), LiteratureEntry::new("b")]);
        let store = MockStore::default().with_document("doc", [("b1", "((id-b \"1\"))"), ("b2", "((id-a \"2\"))")]);
        let fixture = testing::Fixture::new(source, store);
        fixture.ctx.index().register("a", "id-a");
        fixture.ctx.index().register("b", "id-b");
        let literature = enumerate_document(&fixture.ctx, &"doc".to_string()).await.unwrap();
        assert_eq!(literature.iter().collect::<Vec<_>>(), vec!["id-b", "id-a"]);
    }

    #[tokio::test]
    async fn test_enumerate_missing_document() {
        let fixture = testing::Fixture::new(MockSource::default(), MockStore::default());
        let err = enumerate_document(&fixture.ctx, &"missing".to_string()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Store));
    }
}
