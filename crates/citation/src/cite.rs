//! Citing literature from a document.

use crate::Context;
use crate::enumerate::{LiteratureEnum, enumerate_document};
use crate::error::{Error, ErrorKind, Result};
use crate::link::{LinkMode, generate_cite_ref, generate_link};
use crate::materialize::{check_reference_folder, materialize};
use bibnote_store::NoteId;
use exn::OptionExt;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::instrument;

/// A single citekey that was cited successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub citekey: String,
    pub note_id: NoteId,
    /// Citation index the link was rendered with.
    pub index: usize,
    /// Text to insert into the document.
    pub cite_ref: String,
}

/// Outcome of citing a batch of citekeys.
#[derive(Debug, Default)]
pub struct Citations {
    /// Successful citations, in request order.
    pub cited: Vec<Citation>,
    /// Citekeys that could not be cited.
    pub failed: Vec<(String, Error)>,
}
impl Citations {
    /// Every cite ref joined together, ready to insert or copy.
    pub fn text(&self) -> String {
        self.cited.iter().map(|c| c.cite_ref.as_str()).collect()
    }
}

/// Cite `citekeys` from `document` (or from nowhere in particular, e.g. to
/// copy the citations to the clipboard).
///
/// Each citekey's literature note is materialized first. A citekey the
/// document already cites keeps its current index; the others are numbered
/// after the document's existing citations, in request order.
///
/// Citekeys fail independently. Only an unusable reference folder or an
/// unreadable document fails the whole call.
#[instrument(skip_all, fields(document = ?document, citekeys = citekeys.len()))]
pub async fn cite(ctx: &Context, document: Option<&NoteId>, citekeys: &[String]) -> Result<Citations> {
    check_reference_folder(ctx).await?;
    let literature = match document {
        Some(document) => enumerate_document(ctx, document).await?,
        None => LiteratureEnum::default(),
    };

    let materialized = join_all(citekeys.iter().map(|citekey| materialize(ctx, citekey))).await;

    let mut citations = Citations::default();
    let mut assigned: BTreeMap<NoteId, usize> = BTreeMap::new();
    for (citekey, materialized) in citekeys.iter().zip(materialized) {
        let outcome = match materialized {
            Ok(materialized) => {
                let note_id = materialized.note_id;
                let next = literature.len() + assigned.len();
                let index = literature
                    .index_of(&note_id)
                    .unwrap_or_else(|| *assigned.entry(note_id.clone()).or_insert(next));
                cite_one(ctx, citekey, note_id, index).await
            },
            Err(e) => Err(e),
        };
        match outcome {
            Ok(citation) => citations.cited.push(citation),
            Err(e) => {
                tracing::warn!(citekey = %citekey, error = %e, "Failed to cite literature");
                citations.failed.push((citekey.clone(), e));
            },
        }
    }
    tracing::info!(cited = citations.cited.len(), failed = citations.failed.len(), "Cited literature");
    Ok(citations)
}

async fn cite_one(ctx: &Context, citekey: &str, note_id: NoteId, index: usize) -> Result<Citation> {
    let link = generate_link(ctx, citekey, index, LinkMode::Full)
        .await?
        .ok_or_raise(|| ErrorKind::LiteratureNotFound(citekey.to_string()))?;
    let cite_ref = generate_cite_ref(ctx, &note_id, &link);
    Ok(Citation {
        citekey: citekey.to_string(),
        note_id,
        index,
        cite_ref,
    })
}
