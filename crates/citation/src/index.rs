//! Bidirectional citekey to literature note mapping.

use bibnote_store::NoteId;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Maps {
    by_citekey: BTreeMap<String, NoteId>,
    by_note: BTreeMap<NoteId, String>,
}

/// One-to-one mapping between citekeys and the literature notes holding them.
///
/// Both directions live behind a single lock, so a reader never observes half
/// of a [`register`](Self::register). The lock is never held across an
/// `.await`.
///
/// # Examples
///
/// ```
/// use bibnote_citation::CitekeyIndex;
///
/// let index = CitekeyIndex::default();
/// index.register("doe2020", "note-1");
/// assert_eq!(index.lookup("doe2020").as_deref(), Some("note-1"));
/// assert_eq!(index.lookup_reverse("note-1").as_deref(), Some("doe2020"));
/// ```
#[derive(Debug, Default)]
pub struct CitekeyIndex {
    maps: RwLock<Maps>,
}
impl CitekeyIndex {
    /// Note holding `citekey`, if registered.
    pub fn lookup(&self, citekey: &str) -> Option<NoteId> {
        self.read().by_citekey.get(citekey).cloned()
    }

    /// Citekey held by `note_id`, if registered.
    pub fn lookup_reverse(&self, note_id: &str) -> Option<String> {
        self.read().by_note.get(note_id).cloned()
    }

    /// Associate `citekey` with `note_id` in both directions.
    ///
    /// Any previous association of either side is dropped first, keeping the
    /// two directions inverse of each other.
    pub fn register(&self, citekey: impl Into<String>, note_id: impl Into<NoteId>) {
        let (citekey, note_id) = (citekey.into(), note_id.into());
        let mut maps = self.write();
        if let Some(stale_note) = maps.by_citekey.remove(&citekey) {
            maps.by_note.remove(&stale_note);
        }
        if let Some(stale_citekey) = maps.by_note.remove(&note_id) {
            maps.by_citekey.remove(&stale_citekey);
        }
        tracing::debug!(citekey = %citekey, note_id = %note_id, "Registered literature note");
        maps.by_citekey.insert(citekey.clone(), note_id.clone());
        maps.by_note.insert(note_id, citekey);
    }

    /// Sorted snapshot of every registered citekey.
    pub fn citekeys(&self) -> Vec<String> {
        self.read().by_citekey.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().by_citekey.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().by_citekey.is_empty()
    }

    /// Replace the whole mapping at once.
    pub(crate) fn replace(&self, pairs: impl IntoIterator<Item = (String, NoteId)>) {
        let mut fresh = Maps::default();
        for (citekey, note_id) in pairs {
            if let Some(stale_note) = fresh.by_citekey.remove(&citekey) {
                fresh.by_note.remove(&stale_note);
            }
            if let Some(stale_citekey) = fresh.by_note.remove(&note_id) {
                fresh.by_citekey.remove(&stale_citekey);
            }
            fresh.by_citekey.insert(citekey.clone(), note_id.clone());
            fresh.by_note.insert(note_id, citekey);
        }
        *self.write() = fresh;
    }

    // Every write leaves both maps consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Maps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Maps> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }
}
