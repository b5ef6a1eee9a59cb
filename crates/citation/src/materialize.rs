//! Literature notes: one note per cited entry, kept in the reference folder.

use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::template;
use bibnote_store::error::ErrorKind as StoreErrorKind;
use bibnote_store::{FolderId, NoteId, resolve_folder};
use exn::ResultExt;
use tracing::instrument;

/// Characters that cannot appear in a note title.
const FORBIDDEN_TITLE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// What [`materialize`] did to the literature note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeAction {
    /// A new note was created, labelled and registered.
    Created,
    /// The existing note's body was out of date and was rewritten.
    Updated,
    /// The existing note already had the rendered body.
    Unchanged,
}

/// The outcome of (successfully) materializing a citekey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub note_id: NoteId,
    pub action: MaterializeAction,
}

/// Locate the configured reference folder.
///
/// Emits one error notice and returns [`ErrorKind::PathResolution`] when the
/// folder path is invalid or doesn't exist in the store.
pub async fn check_reference_folder(ctx: &Context) -> Result<FolderId> {
    let path = &ctx.config.folder;
    let resolved = resolve_folder(ctx.store.as_ref(), path).await;
    match resolved {
        Ok(Some(folder)) => Ok(folder),
        Ok(None) => {
            ctx.notifier.error(&format!("Reference folder \"{path}\" does not exist"));
            exn::bail!(ErrorKind::PathResolution(path.clone()))
        },
        Err(e) => {
            ctx.notifier.error(&format!("Reference folder \"{path}\" could not be resolved"));
            Err(e).or_raise(|| ErrorKind::PathResolution(path.clone()))
        },
    }
}

/// Replace characters that note titles cannot contain with `_`.
pub(crate) fn sanitize_title(title: &str) -> String {
    title.chars().map(|c| if FORBIDDEN_TITLE_CHARS.contains(&c) || c.is_control() { '_' } else { c }).collect()
}

/// Create or update the literature note of `citekey`.
///
/// The note is looked up in the reference folder by its label (the citekey).
/// An existing note only has its body rewritten when the rendered body
/// differs, so materializing twice creates nothing and writes nothing the
/// second time. A new note is labelled with the citekey and registered in the
/// [`CitekeyIndex`](crate::CitekeyIndex). The note is registered before it is
/// labelled, so a note whose label write failed is found through the index
/// and labelled on the next call.
///
/// Calls for the same citekey are serialized; calls for different citekeys
/// run concurrently.
///
/// # Errors
/// - [`ErrorKind::LiteratureNotFound`] (after one error notice) when the data
///   source has no entry for `citekey`.
/// - [`ErrorKind::PathResolution`] when the reference folder can't be found.
///   Nothing is written in that case.
#[instrument(skip_all, fields(citekey = %citekey))]
pub async fn materialize(ctx: &Context, citekey: &str) -> Result<Materialized> {
    let _guard = ctx.citekey_lock(citekey).await;

    let Some(entry) = ctx.source.entry(citekey).await.or_raise(|| ErrorKind::Source)? else {
        ctx.notifier.error(&format!("No literature entry found for citekey \"{citekey}\""));
        exn::bail!(ErrorKind::LiteratureNotFound(citekey.to_string()));
    };
    let fields = template::entry_fields(&entry);
    let title = sanitize_title(&ctx.templates.title.render(&fields)?);
    let body = ctx.templates.note.render(&fields)?;

    let folder = check_reference_folder(ctx).await?;
    let existing = ctx.store.find_note(&folder, citekey).await.or_raise(|| ErrorKind::Store)?;
    let note_id = match existing {
        Some(note_id) => {
            if ctx.index.lookup(citekey).as_ref() != Some(&note_id) {
                ctx.index.register(citekey, note_id.clone());
            }
            note_id
        },
        None => match relabel_registered(ctx, citekey).await? {
            Some(note_id) => note_id,
            None => {
                let note_id = ctx.store.create_note(&folder, &title, &body).await.or_raise(|| ErrorKind::Store)?;
                // Registered before labelling, so a failed label write is retried
                // on the next call instead of creating a second note.
                ctx.index.register(citekey, note_id.clone());
                ctx.store.set_note_label(&note_id, citekey).await.or_raise(|| ErrorKind::Store)?;
                tracing::info!(note_id = %note_id, "Created literature note");
                return Ok(Materialized {
                    note_id,
                    action: MaterializeAction::Created,
                });
            },
        },
    };

    let current = ctx.store.read_block(&note_id).await.or_raise(|| ErrorKind::Store)?;
    let action = if current == body {
        MaterializeAction::Unchanged
    } else {
        ctx.store.update_note_body(&note_id, &body).await.or_raise(|| ErrorKind::Store)?;
        tracing::info!(note_id = %note_id, "Updated literature note");
        MaterializeAction::Updated
    };
    Ok(Materialized { note_id, action })
}

/// Label the note already registered for `citekey`, for a note whose label
/// never made it to the store. Returns `None` when nothing is registered or
/// the registered note no longer exists.
async fn relabel_registered(ctx: &Context, citekey: &str) -> Result<Option<NoteId>> {
    let Some(note_id) = ctx.index.lookup(citekey) else {
        return Ok(None);
    };
    match ctx.store.set_note_label(&note_id, citekey).await {
        Ok(()) => {
            tracing::info!(note_id = %note_id, "Labelled registered literature note");
            Ok(Some(note_id))
        },
        Err(e) if matches!(&*e, StoreErrorKind::NotFound(_)) => {
            tracing::debug!(note_id = %note_id, "Registered literature note is gone");
            Ok(None)
        },
        Err(e) => Err(e).or_raise(|| ErrorKind::Store),
    }
}

/// Rebuild the [`CitekeyIndex`](crate::CitekeyIndex) from the labelled notes
/// in the reference folder, returning how many notes were registered.
///
/// The index is replaced as a whole, so citekeys whose notes have gone are
/// forgotten.
#[instrument(skip_all)]
pub async fn rebuild_index(ctx: &Context) -> Result<usize> {
    let folder = check_reference_folder(ctx).await?;
    let notes = ctx.store.notes(&folder).await.or_raise(|| ErrorKind::Store)?;
    let pairs: Vec<(String, NoteId)> = notes
        .into_iter()
        .filter_map(|note| match note.label {
            Some(label) if !label.trim().is_empty() => Some((label, note.id)),
            _ => None,
        })
        .collect();
    ctx.index.replace(pairs);
    let registered = ctx.index.len();
    tracing::info!(registered, "Rebuilt citekey index");
    Ok(registered)
}
