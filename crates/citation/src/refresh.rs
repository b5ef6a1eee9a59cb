use crate::error::{ErrorKind, Result};
use crate::materialize::sanitize_title;
use crate::template;
use crate::{Context, MAX_PROCESS_CONCURRENCY};
use async_stream::stream;
use bibnote_store::NoteId;
use exn::{OptionExt, ResultExt};
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};

/// The outcome of (successfully) refreshing a single literature note title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleAction {
    /// The note was renamed to the freshly rendered title.
    Renamed { note_id: NoteId, title: String },
    /// The note already had the rendered title; no work performed.
    Unchanged(NoteId),
}

/// Progress events emitted by [`refresh_titles`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete): exactly once, with the
///    number of registered citekeys.
/// 3. [`Refreshed`](Self::Refreshed): zero or more times, one per citekey.
/// 4. [`Complete`](Self::Complete): exactly once, signalling the stream is
///    finished.
#[derive(Debug)]
pub enum RefreshEvent {
    /// Refreshing has begun; emitted exactly once before any other event.
    Started,
    /// All registered citekeys have been collected; the total count is now known.
    DiscoveryComplete(u64),
    /// A literature note title has been refreshed.
    Refreshed(TitleAction),
    /// Every citekey has been handled; the stream is finished.
    Complete,
}

/// Streams [`RefreshEvent`]s while re-rendering the title of every registered
/// literature note, renaming the notes whose title changed.
///
/// Citekeys are handled concurrently up to `MAX_PROCESS_CONCURRENCY` (100) at
/// a time. Individual failures are surfaced as `Err` items without
/// terminating the stream. Once every citekey has been handled, a single
/// info notice reports how many notes were renamed.
pub fn refresh_titles(ctx: &Context) -> impl Stream<Item = Result<RefreshEvent>> + '_ {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(RefreshEvent::Started);

        let citekeys = ctx.index.citekeys();
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(RefreshEvent::DiscoveryComplete(u64::try_from(citekeys.len()).unwrap_or(0)));

        let mut futures: Vec<_> = citekeys.into_iter().map(|citekey| refresh_title(ctx, citekey)).collect();
        let mut processing = FuturesUnordered::new();
        processing.extend(futures.drain(..MAX_PROCESS_CONCURRENCY.min(futures.len())));
        let (mut renamed, mut failed) = (0usize, 0usize);
        while let Some(result) = processing.next().await {
            match &result {
                Ok(TitleAction::Renamed { .. }) => renamed += 1,
                Ok(TitleAction::Unchanged(_)) => {},
                Err(e) => {
                    failed += 1;
                    tracing::warn!(error = %e, "Failed to refresh literature note title");
                },
            }
            yield result.map(RefreshEvent::Refreshed);
            // Pop-n-push, but FIFO instead of LIFO.
            if !futures.is_empty() {
                processing.push(futures.remove(0));
            }
        }

        tracing::info!(renamed, failed, "Refreshed literature note titles");
        ctx.notifier.info(&format!("Refreshed {renamed} literature note title(s)"));
        yield Ok(RefreshEvent::Complete);
    })
}

async fn refresh_title(ctx: &Context, citekey: String) -> Result<TitleAction> {
    let note_id = ctx.index.lookup(&citekey).ok_or_raise(|| ErrorKind::LiteratureNotFound(citekey.clone()))?;
    let Some(entry) = ctx.source.entry(&citekey).await.or_raise(|| ErrorKind::Source)? else {
        ctx.notifier.error(&format!("No literature entry found for citekey \"{citekey}\""));
        exn::bail!(ErrorKind::LiteratureNotFound(citekey));
    };
    let title = sanitize_title(&ctx.templates.title.render(&template::entry_fields(&entry))?);
    let current = ctx.store.note_title(&note_id).await.or_raise(|| ErrorKind::Store)?;
    if current == title {
        return Ok(TitleAction::Unchanged(note_id));
    }
    ctx.store.rename_note(&note_id, &title).await.or_raise(|| ErrorKind::Store)?;
    tracing::debug!(citekey = %citekey, note_id = %note_id, "Renamed literature note");
    Ok(TitleAction::Renamed { note_id, title })
}
