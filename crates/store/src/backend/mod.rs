//! Host document store trait and implementations.
//!
//! This module defines the `NoteStore` trait, which provides a unified
//! interface to the note-taking application hosting the literature notes and
//! the documents that cite them. Concrete clients (HTTP kernel APIs, local
//! workspaces, ...) live downstream; this crate only ships an in-memory
//! implementation for tests.

#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockStore, Operations};
use crate::error::Result;
use crate::models::{Block, BlockId, Folder, FolderId, NoteId, NoteInfo};
use async_trait::async_trait;

/// Unified interface for host document stores.
///
/// All operations are asynchronous since every call is a round-trip to the
/// host application. Implementations own their I/O failure semantics
/// (timeouts, retries); callers only see the resulting [`Error`](crate::error::Error).
///
/// # Identifiers
/// Notes are whole documents and documents are blocks, so any [`NoteId`] may
/// be passed where a [`BlockId`] is expected.
///
/// # Examples
///
/// ```
/// use bibnote_store::{NoteStore, error::Result};
///
/// async fn title_or_placeholder(store: &dyn NoteStore, id: &str) -> Result<String> {
///     let title = store.note_title(&id.to_string()).await?;
///     Ok(if title.is_empty() { "Untitled".to_string() } else { title })
/// }
/// ```
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// List the direct child folders of `parent`, or the top-level folders
    /// (notebooks) when `parent` is `None`.
    async fn folders(&self, parent: Option<&FolderId>) -> Result<Vec<Folder>>;

    /// List the notes directly inside `folder`.
    async fn notes(&self, folder: &FolderId) -> Result<Vec<NoteInfo>>;

    /// Find the note inside `folder` whose label equals `label`.
    async fn find_note(&self, folder: &FolderId, label: &str) -> Result<Option<NoteId>>;

    /// Create a new note inside `folder`, returning its identifier.
    async fn create_note(&self, folder: &FolderId, title: &str, body: &str) -> Result<NoteId>;

    /// Replace the body of an existing note, keeping its title and label.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the note
    /// does not exist.
    async fn update_note_body(&self, id: &NoteId, body: &str) -> Result<()>;

    /// Set the internal name (label) of a note.
    async fn set_note_label(&self, id: &NoteId, label: &str) -> Result<()>;

    /// Current title of a note.
    async fn note_title(&self, id: &NoteId) -> Result<String>;

    /// Rename a note.
    async fn rename_note(&self, id: &NoteId, title: &str) -> Result<()>;

    /// Read the raw content of a block. For a document this is the serialized
    /// content of the whole document.
    async fn read_block(&self, id: &BlockId) -> Result<String>;

    /// Overwrite the raw content of a single block.
    async fn write_block(&self, id: &BlockId, content: &str) -> Result<()>;

    /// All blocks of `document` that contain at least one citation marker.
    async fn blocks_referencing(&self, document: &NoteId) -> Result<Vec<Block>>;
}
