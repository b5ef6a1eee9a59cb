//! In-memory note store for testing.

use crate::NoteStore;
use crate::error::{ErrorKind, Result};
use crate::models::{Block, BlockId, Folder, FolderId, NoteId, NoteInfo};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// Separator used when serializing a whole document from its blocks.
const BLOCK_SEPARATOR: &str = "\n\n";

struct MockFolder {
    parent: Option<FolderId>,
    title: String,
}

struct MockNote {
    folder: FolderId,
    title: String,
    label: Option<String>,
    body: String,
}

struct MockBlock {
    id: BlockId,
    document: NoteId,
    content: String,
}

/// Counts of mutating calls made against a [`MockStore`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Operations {
    pub created: usize,
    pub body_updates: usize,
    pub labels: usize,
    pub renames: usize,
    pub block_writes: usize,
}

#[derive(Default)]
struct State {
    next_id: u64,
    folders: BTreeMap<FolderId, MockFolder>,
    notes: BTreeMap<NoteId, MockNote>,
    blocks: Vec<MockBlock>,
    failing: BTreeSet<BlockId>,
    label_failures: usize,
    operations: Operations,
}
impl State {
    fn note_mut(&mut self, id: &NoteId) -> Result<&mut MockNote> {
        self.notes.get_mut(id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id.clone())))
    }

    fn document_content(&self, document: &NoteId) -> Option<String> {
        let blocks: Vec<&str> =
            self.blocks.iter().filter(|b| &b.document == document).map(|b| b.content.as_str()).collect();
        (!blocks.is_empty()).then(|| blocks.join(BLOCK_SEPARATOR))
    }
}

/// In-memory note store for testing.
///
/// Folders, notes and document blocks are kept behind a [`RwLock`], so all
/// trait methods can operate on `&self`. Builder methods take `self` by value
/// and are meant for test setup before the store is shared.
///
/// # Examples
///
/// ```ignore
/// use bibnote_store::backend::{MockStore, NoteStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::default()
///     .with_folder("refs", None, "References")
///     .with_document("doc", [("b1", "See ((note-1 \"[1]\"))")]);
/// let blocks = store.blocks_referencing(&"doc".to_string()).await?;
/// assert_eq!(blocks.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockStore {
    name: String,
    state: RwLock<State>,
}

impl MockStore {
    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a folder below `parent` (or at the top level).
    pub fn with_folder(mut self, id: impl Into<FolderId>, parent: Option<&str>, title: impl Into<String>) -> Self {
        let folder = MockFolder {
            parent: parent.map(str::to_string),
            title: title.into(),
        };
        self.state.get_mut().folders.insert(id.into(), folder);
        self
    }

    /// Add an existing note.
    pub fn with_note(
        mut self,
        id: impl Into<NoteId>,
        folder: impl Into<FolderId>,
        title: impl Into<String>,
        label: Option<&str>,
        body: impl Into<String>,
    ) -> Self {
        let note = MockNote {
            folder: folder.into(),
            title: title.into(),
            label: label.map(str::to_string),
            body: body.into(),
        };
        self.state.get_mut().notes.insert(id.into(), note);
        self
    }

    /// Add a document made of the given `(block id, content)` pairs, in order.
    pub fn with_document(
        mut self,
        document: impl Into<NoteId>,
        blocks: impl IntoIterator<Item = (impl Into<BlockId>, impl Into<String>)>,
    ) -> Self {
        let document = document.into();
        let state = self.state.get_mut();
        for (id, content) in blocks {
            state.blocks.push(MockBlock {
                id: id.into(),
                document: document.clone(),
                content: content.into(),
            });
        }
        self
    }

    /// Make every write to `block` fail with a backend error.
    pub fn with_failing_block(mut self, block: impl Into<BlockId>) -> Self {
        self.state.get_mut().failing.insert(block.into());
        self
    }

    /// Make the next `count` label writes fail with a backend error.
    pub fn with_label_failures(mut self, count: usize) -> Self {
        self.state.get_mut().label_failures = count;
        self
    }

    /// Counts of mutating calls made so far.
    pub async fn operations(&self) -> Operations {
        self.state.read().await.operations
    }

    /// Body of a note, if it exists.
    pub async fn note_body(&self, id: &str) -> Option<String> {
        self.state.read().await.notes.get(id).map(|n| n.body.clone())
    }

    /// Label of a note, if it exists and has one.
    pub async fn note_label(&self, id: &str) -> Option<String> {
        self.state.read().await.notes.get(id).and_then(|n| n.label.clone())
    }
}
impl Default for MockStore {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            state: RwLock::new(State::default()),
        }
    }
}

#[async_trait]
impl NoteStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn folders(&self, parent: Option<&FolderId>) -> Result<Vec<Folder>> {
        let state = self.state.read().await;
        if let Some(parent) = parent
            && !state.folders.contains_key(parent)
        {
            exn::bail!(ErrorKind::NotFound(parent.clone()));
        }
        Ok(state
            .folders
            .iter()
            .filter(|(_, f)| f.parent.as_ref() == parent)
            .map(|(id, f)| Folder {
                id: id.clone(),
                title: f.title.clone(),
            })
            .collect())
    }

    async fn notes(&self, folder: &FolderId) -> Result<Vec<NoteInfo>> {
        let state = self.state.read().await;
        if !state.folders.contains_key(folder) {
            exn::bail!(ErrorKind::NotFound(folder.clone()));
        }
        Ok(state
            .notes
            .iter()
            .filter(|(_, n)| &n.folder == folder)
            .map(|(id, n)| NoteInfo {
                id: id.clone(),
                title: n.title.clone(),
                label: n.label.clone(),
            })
            .collect())
    }

    async fn find_note(&self, folder: &FolderId, label: &str) -> Result<Option<NoteId>> {
        let state = self.state.read().await;
        Ok(state
            .notes
            .iter()
            .find(|(_, n)| &n.folder == folder && n.label.as_deref() == Some(label))
            .map(|(id, _)| id.clone()))
    }

    async fn create_note(&self, folder: &FolderId, title: &str, body: &str) -> Result<NoteId> {
        let mut state = self.state.write().await;
        if !state.folders.contains_key(folder) {
            exn::bail!(ErrorKind::NotFound(folder.clone()));
        }
        state.next_id += 1;
        let id = format!("note-{:04}", state.next_id);
        let note = MockNote {
            folder: folder.clone(),
            title: title.to_string(),
            label: None,
            body: body.to_string(),
        };
        state.notes.insert(id.clone(), note);
        state.operations.created += 1;
        Ok(id)
    }

    async fn update_note_body(&self, id: &NoteId, body: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.note_mut(id)?.body = body.to_string();
        state.operations.body_updates += 1;
        Ok(())
    }

    async fn set_note_label(&self, id: &NoteId, label: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.label_failures > 0 {
            state.label_failures -= 1;
            exn::bail!(ErrorKind::Backend(format!("label rejected for note {id}")));
        }
        state.note_mut(id)?.label = Some(label.to_string());
        state.operations.labels += 1;
        Ok(())
    }

    async fn note_title(&self, id: &NoteId) -> Result<String> {
        let state = self.state.read().await;
        let note = state.notes.get(id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id.clone())))?;
        Ok(note.title.clone())
    }

    async fn rename_note(&self, id: &NoteId, title: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.note_mut(id)?.title = title.to_string();
        state.operations.renames += 1;
        Ok(())
    }

    async fn read_block(&self, id: &BlockId) -> Result<String> {
        let state = self.state.read().await;
        if let Some(block) = state.blocks.iter().find(|b| &b.id == id) {
            return Ok(block.content.clone());
        }
        if let Some(content) = state.document_content(id) {
            return Ok(content);
        }
        match state.notes.get(id) {
            Some(note) => Ok(note.body.clone()),
            None => exn::bail!(ErrorKind::NotFound(id.clone())),
        }
    }

    async fn write_block(&self, id: &BlockId, content: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing.contains(id) {
            exn::bail!(ErrorKind::Backend(format!("write rejected for block {id}")));
        }
        let block = state
            .blocks
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id.clone())))?;
        block.content = content.to_string();
        state.operations.block_writes += 1;
        Ok(())
    }

    async fn blocks_referencing(&self, document: &NoteId) -> Result<Vec<Block>> {
        let state = self.state.read().await;
        Ok(state
            .blocks
            .iter()
            .filter(|b| &b.document == document && b.content.contains("(("))
            .map(|b| Block::new(b.id.clone(), b.content.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> String {
        s.to_string()
    }

    #[tokio::test]
    async fn test_create_and_find_note() {
        let store = MockStore::default().with_folder("refs", None, "References");
        let note = store.create_note(&id("refs"), "Doe 2020", "body").await.unwrap();
        assert_eq!(store.find_note(&id("refs"), "doe2020").await.unwrap(), None);
        store.set_note_label(&note, "doe2020").await.unwrap();
        assert_eq!(store.find_note(&id("refs"), "doe2020").await.unwrap(), Some(note.clone()));
        assert_eq!(store.note_title(&note).await.unwrap(), "Doe 2020");
        assert_eq!(store.operations().await.created, 1);
    }

    #[tokio::test]
    async fn test_create_note_in_missing_folder() {
        let store = MockStore::default();
        let err = store.create_note(&id("nope"), "title", "body").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_document_joins_blocks() {
        let store = MockStore::default().with_document("doc", [("b1", "first"), ("b2", "second")]);
        assert_eq!(store.read_block(&id("doc")).await.unwrap(), "first\n\nsecond");
        assert_eq!(store.read_block(&id("b2")).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_read_missing_block() {
        let store = MockStore::default();
        let err = store.read_block(&id("missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blocks_referencing_filters_markers() {
        let store = MockStore::default()
            .with_document("doc", [("b1", "plain"), ("b2", "cites ((n1 \"x\"))")])
            .with_document("other", [("b3", "((n2 \"y\"))")]);
        let blocks = store.blocks_referencing(&id("doc")).await.unwrap();
        assert_eq!(blocks, vec![Block::new("b2", "cites ((n1 \"x\"))")]);
    }

    #[tokio::test]
    async fn test_failing_block_write() {
        let store = MockStore::default().with_document("doc", [("b1", "a")]).with_failing_block("b1");
        let err = store.write_block(&id("b1"), "b").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.read_block(&id("b1")).await.unwrap(), "a");
    }

    #[tokio::test]
    async fn test_label_failures_are_consumed() {
        let store = MockStore::default().with_note("n1", "refs", "Doe", None, "").with_label_failures(1);
        assert!(store.set_note_label(&id("n1"), "doe2020").await.is_err());
        store.set_note_label(&id("n1"), "doe2020").await.unwrap();
        assert_eq!(store.note_label(&id("n1")).await.as_deref(), Some("doe2020"));
        assert_eq!(store.operations().await.labels, 1);
    }

    #[tokio::test]
    async fn test_folders_by_parent() {
        let store = MockStore::default()
            .with_folder("nb", None, "Notebook")
            .with_folder("refs", Some("nb"), "References")
            .with_folder("misc", Some("nb"), "Misc");
        let top = store.folders(None).await.unwrap();
        assert_eq!(top.len(), 1);
        let children = store.folders(Some(&id("nb"))).await.unwrap();
        let titles: Vec<_> = children.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Misc", "References"]);
    }

    #[tokio::test]
    async fn test_rename_counts() {
        let store = MockStore::default()
            .with_folder("refs", None, "References")
            .with_note("n1", "refs", "Old", Some("ck"), "");
        store.rename_note(&id("n1"), "New").await.unwrap();
        assert_eq!(store.note_title(&id("n1")).await.unwrap(), "New");
        assert_eq!(store.operations().await.renames, 1);
    }
}
