//! Store models.
//!
//! Identifiers are opaque strings handed out by the host application; the
//! store never interprets them.

/// Identifier of a note (a whole document) in the host store.
pub type NoteId = String;
/// Identifier of a single block. Documents are blocks too, so a [`NoteId`]
/// is always a valid [`BlockId`].
pub type BlockId = String;
/// Identifier of a folder (or notebook) in the host store.
pub type FolderId = String;

/// An addressable unit of document content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    /// Raw (serialized markdown) content of the block.
    pub content: String,
}
impl Block {
    pub fn new(id: impl Into<BlockId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// A folder as listed by [`NoteStore::folders`](crate::NoteStore::folders).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: FolderId,
    /// Human-readable title, matched against folder path segments.
    pub title: String,
}

/// Note metadata as listed by [`NoteStore::notes`](crate::NoteStore::notes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteInfo {
    pub id: NoteId,
    pub title: String,
    /// Internal name of the note. Literature notes are labelled with their
    /// citekey so they can be found again.
    pub label: Option<String>,
}
