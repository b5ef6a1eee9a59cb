//! Keeping citation links in step with their literature.
//!
//! When literature is cited, reordered or edited, every marker in a document
//! may need new link text. Synchronization re-renders the link of each marker
//! whose note the document cites and rewrites the blocks where the shown text
//! is out of date. Blocks that are already correct are never written, so a
//! second run right after the first writes nothing.

use crate::Context;
use crate::enumerate::{LiteratureEnum, enumerate_document};
use crate::error::{Error, ErrorKind, Result};
use crate::link::{LinkMode, generate_link};
use crate::marker::{self, format_marker};
use bibnote_store::{Block, BlockId, NoteId};
use exn::ResultExt;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::instrument;

/// New content for a block whose citation links are out of date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUpdate {
    pub block_id: BlockId,
    pub content: String,
}

/// Outcome of synchronizing a set of blocks.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Blocks that were rewritten.
    pub updated: Vec<BlockId>,
    /// Blocks that were already up to date.
    pub unchanged: usize,
    /// Blocks that could not be read, rendered or written.
    pub failed: Vec<(BlockId, Error)>,
}

/// Work out the new content of `block`, or `None` if every marker already
/// shows the right link.
///
/// Markers pointing at notes the document doesn't cite (or that aren't
/// literature notes) are left alone, as are markers whose link cannot be
/// rendered. Every link is rendered before any text is replaced, and all
/// markers for the same note receive the same replacement.
pub async fn compute_update(ctx: &Context, block: &Block, literature: &LiteratureEnum) -> Result<Option<BlockUpdate>> {
    let markers = marker::parse(&block.content);
    let mode = LinkMode::for_config(ctx.config.custom_cite_text);

    let mut candidates: BTreeMap<&str, (String, usize)> = BTreeMap::new();
    for marker in &markers {
        if candidates.contains_key(marker.note_id) {
            continue;
        }
        let Some(index) = literature.index_of(marker.note_id) else {
            tracing::debug!(note_id = %marker.note_id, "Marker does not cite enumerated literature");
            continue;
        };
        let Some(citekey) = ctx.index.lookup_reverse(marker.note_id) else {
            tracing::debug!(note_id = %marker.note_id, "Marker points at an unregistered note");
            continue;
        };
        candidates.insert(marker.note_id, (citekey, index));
    }

    let rendered = join_all(candidates.into_iter().map(|(note_id, (citekey, index))| async move {
        generate_link(ctx, &citekey, index, mode).await.map(|link| (note_id, link))
    }))
    .await;
    let mut links: BTreeMap<&str, String> = BTreeMap::new();
    for result in rendered {
        match result? {
            (note_id, Some(link)) if !link.is_empty() => {
                links.insert(note_id, link);
            },
            (note_id, _) => tracing::debug!(note_id = %note_id, "No link rendered; leaving marker untouched"),
        }
    }

    let modified = markers.iter().any(|m| links.get(m.note_id).is_some_and(|link| !m.shows(link)));
    if !modified {
        return Ok(None);
    }

    let mut content = String::with_capacity(block.content.len());
    let mut cursor = 0;
    for marker in &markers {
        let Some(link) = links.get(marker.note_id) else {
            continue;
        };
        content.push_str(&block.content[cursor..marker.offset]);
        content.push_str(&format_marker(marker.note_id, link));
        cursor = marker.offset + marker.len;
    }
    content.push_str(&block.content[cursor..]);
    Ok(Some(BlockUpdate {
        block_id: block.id.clone(),
        content,
    }))
}

/// Rewrite every block in `blocks` whose citation links are out of date.
///
/// Blocks are handled concurrently and independently: one block failing is
/// recorded in the [`SyncReport`] and never stops the others.
#[instrument(skip_all, fields(blocks = blocks.len(), cited = literature.len()))]
pub async fn synchronize(ctx: &Context, blocks: Vec<Block>, literature: &LiteratureEnum) -> SyncReport {
    let outcomes = join_all(blocks.into_iter().map(|block| async move {
        let outcome = synchronize_block(ctx, &block, literature).await;
        (block.id, outcome)
    }))
    .await;

    let mut report = SyncReport::default();
    for (block_id, outcome) in outcomes {
        match outcome {
            Ok(true) => report.updated.push(block_id),
            Ok(false) => report.unchanged += 1,
            Err(e) => {
                tracing::warn!(block_id = %block_id, error = %e, "Failed to synchronize block");
                report.failed.push((block_id, e));
            },
        }
    }
    tracing::info!(updated = report.updated.len(), failed = report.failed.len(), "Synchronized citation links");
    report
}

async fn synchronize_block(ctx: &Context, block: &Block, literature: &LiteratureEnum) -> Result<bool> {
    let Some(update) = compute_update(ctx, block, literature).await? else {
        return Ok(false);
    };
    ctx.store.write_block(&update.block_id, &update.content).await.or_raise(|| ErrorKind::Store)?;
    tracing::debug!(block_id = %update.block_id, "Rewrote citation links");
    Ok(true)
}

/// Synchronize every citing block of `document`.
///
/// Failing to list the blocks or enumerate the document fails the call;
/// anything after that is reported per block.
#[instrument(skip_all, fields(document = %document))]
pub async fn update_literature_links(ctx: &Context, document: &NoteId) -> Result<SyncReport> {
    let blocks = ctx.store.blocks_referencing(document).await.or_raise(|| ErrorKind::Store)?;
    let literature = enumerate_document(ctx, document).await?;
    Ok(synchronize(ctx, blocks, &literature).await)
}
