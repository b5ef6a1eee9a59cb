//! Folder path validation and resolution.
//!
//! Users configure the reference folder as a human-readable path such as
//! `"Research/References"`, while the host store addresses folders by opaque
//! identifiers. This module translates one into the other.

use crate::NoteStore;
use crate::error::{ErrorKind, Result};
use crate::models::FolderId;
use std::future::Future;
use std::pin::Pin;

/// Validates a human-readable folder path and splits it into segments.
///
/// Segments are trimmed; empty and `.` segments are dropped and `..` removes
/// the previous segment. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the non-empty list of segments if valid, or
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) if the path is empty
/// or escapes the root.
///
/// # Examples
///
/// ```
/// use bibnote_store::validate_folder;
/// // Valid paths
/// assert_eq!(validate_folder("/References").unwrap(), vec!["References"]);
/// assert_eq!(validate_folder(" Research / Papers/ ").unwrap(), vec!["Research", "Papers"]);
/// assert!(validate_folder("a/../b").is_ok()); // (never leaves the root)
/// // Invalid paths
/// assert!(validate_folder("../References").is_err());
/// assert!(validate_folder("/").is_err());
/// assert!(validate_folder("a\0b").is_err());
/// ```
pub fn validate(path: impl AsRef<str>) -> Result<Vec<String>> {
    let path = path.as_ref();
    if path.contains('\0') {
        exn::bail!(ErrorKind::InvalidPath(path.to_string()));
    }
    let mut segments: Vec<String> = Vec::new();
    for segment in path.split('/').map(str::trim) {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_string()));
                }
            },
            s => segments.push(s.to_string()),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.to_string())),
        false => Ok(segments),
    }
}

/// Resolves a human-readable folder path to the identifier of the folder it
/// names.
///
/// Every segment must match the title of a folder below the previous one,
/// starting at the top level. Sibling folders may share a title, so each
/// level is searched depth-first with candidates in ascending identifier
/// order; the first complete chain wins. Returns `Ok(None)` when no chain
/// matches every segment.
pub async fn resolve(store: &dyn NoteStore, path: impl AsRef<str>) -> Result<Option<FolderId>> {
    let path = path.as_ref();
    let segments = validate(path)?;
    let resolved = resolve_from(store, None, &segments).await?;
    tracing::debug!(store = store.name(), path, folder = ?resolved, "Resolved folder path");
    Ok(resolved)
}

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<FolderId>>> + Send + 'a>>;

fn resolve_from<'a>(
    store: &'a dyn NoteStore,
    parent: Option<&'a FolderId>,
    segments: &'a [String],
) -> ResolveFuture<'a> {
    // Pin that sucker! Recursive async needs a boxed future of known size.
    Box::pin(async move {
        let Some((segment, rest)) = segments.split_first() else {
            return Ok(parent.cloned());
        };
        let mut candidates: Vec<FolderId> =
            store.folders(parent).await?.into_iter().filter(|f| f.title == *segment).map(|f| f.id).collect();
        candidates.sort();
        for candidate in candidates {
            if let Some(found) = resolve_from(store, Some(&candidate), rest).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    })
}
