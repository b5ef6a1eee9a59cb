//! Literature notes and citation links for note-taking applications.
//!
//! Bibliographic entries come from a [`DataSource`](bibnote_source::DataSource)
//! and are materialized as literature notes inside a
//! [`NoteStore`](bibnote_store::NoteStore). Documents cite those notes through
//! inline markers `((<noteId> "<link>"))`, whose link text is rendered from a
//! template and kept up to date by [`update_literature_links`].
//!
//! Every operation takes a [`Context`] bundling the collaborators, the
//! compiled templates and the [`CitekeyIndex`].

mod cite;
mod consts;
mod enumerate;
pub mod error;
mod index;
mod link;
pub mod marker;
mod materialize;
mod notice;
mod refresh;
mod sync;
pub mod template;

pub use crate::cite::{Citation, Citations, cite};
pub use crate::enumerate::{LiteratureEnum, enumerate, enumerate_document};
pub use crate::index::CitekeyIndex;
pub use crate::link::{LinkMode, generate_cite_ref, generate_link};
pub use crate::materialize::{MaterializeAction, Materialized, check_reference_folder, materialize, rebuild_index};
pub use crate::notice::{Notifier, TracingNotifier};
pub use crate::refresh::{RefreshEvent, TitleAction, refresh_titles};
pub use crate::sync::{BlockUpdate, SyncReport, compute_update, synchronize, update_literature_links};
use crate::error::Result;
use crate::template::Template;
use bibnote_config::ReferenceConfig;
use bibnote_source::SourceHandle;
use bibnote_store::StoreHandle;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Upper bound on concurrent per-item operations in batch streams.
pub(crate) const MAX_PROCESS_CONCURRENCY: usize = 100;

/// The configured templates, compiled once.
pub(crate) struct Templates {
    pub(crate) title: Template,
    pub(crate) note: Template,
    pub(crate) link: Template,
    /// Inner template of the link-only sub-template, if the link template has one.
    pub(crate) link_only: Option<Template>,
}

/// Everything an operation needs: collaborators, templates and shared state.
///
/// The [`CitekeyIndex`] is shared through an [`Arc`], so several contexts
/// (e.g. one per open workspace view) can work against the same mapping.
pub struct Context {
    pub(crate) source: SourceHandle,
    pub(crate) store: StoreHandle,
    pub(crate) index: Arc<CitekeyIndex>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) templates: Templates,
    pub(crate) config: ReferenceConfig,
    locks: Mutex<BTreeMap<String, Arc<AsyncMutex<()>>>>,
}
impl Context {
    /// Compile the configured templates and bundle the collaborators.
    ///
    /// Returns [`ErrorKind::Template`](crate::error::ErrorKind::Template) if any
    /// template fails to compile.
    pub fn new(config: &ReferenceConfig, source: SourceHandle, store: StoreHandle) -> Result<Self> {
        let templates = Templates {
            title: config.title_template.parse()?,
            note: config.note_template.parse()?,
            link: config.link_template.parse()?,
            link_only: link::link_only_template(&config.link_template)?,
        };
        Ok(Self {
            source,
            store,
            index: Arc::new(CitekeyIndex::default()),
            notifier: Arc::new(TracingNotifier),
            templates,
            config: config.clone(),
            locks: Mutex::new(BTreeMap::new()),
        })
    }

    /// Share an existing index instead of starting from an empty one.
    pub fn with_index(mut self, index: Arc<CitekeyIndex>) -> Self {
        self.index = index;
        self
    }

    /// Send notices somewhere other than [`tracing`].
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn index(&self) -> &Arc<CitekeyIndex> {
        &self.index
    }

    pub fn config(&self) -> &ReferenceConfig {
        &self.config
    }

    /// Serialize work on a single citekey. Other citekeys are unaffected.
    pub(crate) async fn citekey_lock(&self, citekey: &str) -> CitekeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(citekey.to_string()).or_default().clone()
        };
        CitekeyGuard {
            locks: &self.locks,
            citekey: citekey.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Holds the lock of one citekey. The lock is forgotten on release once no
/// other task holds or waits for it, so the lock map only contains citekeys
/// that are in use.
pub(crate) struct CitekeyGuard<'a> {
    locks: &'a Mutex<BTreeMap<String, Arc<AsyncMutex<()>>>>,
    citekey: String,
    guard: Option<OwnedMutexGuard<()>>,
}
impl Drop for CitekeyGuard<'_> {
    fn drop(&mut self) {
        // Waiters clone the lock under the map lock, so the count can't grow here.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        self.guard.take();
        if locks.get(&self.citekey).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.citekey);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::Context;
    use crate::notice::Notifier;
    use bibnote_config::ReferenceConfig;
    use bibnote_source::backend::MockSource;
    use bibnote_source::{LiteratureEntry, SourceHandle};
    use bibnote_store::StoreHandle;
    use bibnote_store::backend::MockStore;
    use std::sync::{Arc, Mutex};

    /// Keeps every notice for later inspection.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub(crate) errors: Mutex<Vec<String>>,
        pub(crate) infos: Mutex<Vec<String>>,
    }
    impl RecordingNotifier {
        pub(crate) fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }

        pub(crate) fn infos(&self) -> Vec<String> {
            self.infos.lock().unwrap().clone()
        }
    }
    impl Notifier for RecordingNotifier {
        fn info(&self, message: &str) {
            self.infos.lock().unwrap().push(message.to_string());
        }

        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    /// A context wired to mocks, keeping handles on each of them.
    pub(crate) struct Fixture {
        pub(crate) ctx: Context,
        pub(crate) source: Arc<MockSource>,
        pub(crate) store: Arc<MockStore>,
        pub(crate) notices: Arc<RecordingNotifier>,
    }
    impl Fixture {
        pub(crate) fn new(source: MockSource, store: MockStore) -> Self {
            Self::with_config(reference_config(), source, store)
        }

        pub(crate) fn with_config(config: ReferenceConfig, source: MockSource, store: MockStore) -> Self {
            let source = Arc::new(source);
            let store = Arc::new(store);
            let notices = Arc::new(RecordingNotifier::default());
            let source_handle: SourceHandle = source.clone();
            let store_handle: StoreHandle = store.clone();
            let ctx = Context::new(&config, source_handle, store_handle).unwrap().with_notifier(notices.clone());
            Self {
                ctx,
                source,
                store,
                notices,
            }
        }
    }

    /// Reference configuration with short, predictable templates.
    pub(crate) fn reference_config() -> ReferenceConfig {
        ReferenceConfig {
            folder: "Notebook/References".to_string(),
            title_template: "{{ citekey }} {{ title }}".to_string(),
            note_template: "# {{ title }}\n\n{{ author }}".to_string(),
            link_template: "[{{ number }}] {{ author }}".to_string(),
            custom_cite_text: false,
        }
    }

    /// Store with the reference folder in place.
    pub(crate) fn store() -> MockStore {
        MockStore::default().with_folder("nb", None, "Notebook").with_folder("refs", Some("nb"), "References")
    }

    pub(crate) fn entry(citekey: &str, title: &str, family: &str) -> LiteratureEntry {
        LiteratureEntry::new(citekey)
            .with_field("title", title)
            .with_field("author", serde_json::json!([{ "family": family }]))
    }
}
