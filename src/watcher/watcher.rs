//! File system watcher using notify-rs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, Debouncer};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::events::{EventBatch, StoryEvent};
use super::filter::StoryGlob;
use super::scanner::resolve_story_files_in;
use crate::error::WatcherError;
use crate::Result;

/// Debounce duration for file events.
const DEBOUNCE_DURATION: Duration = Duration::from_millis(100);

/// Capacity of the batch channel between notify and the session.
const CHANNEL_CAPACITY: usize = 100;

/// Story watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Canonical project root.
    pub root: PathBuf,
    /// Stories glob.
    pub glob: StoryGlob,
    /// Debounce duration.
    pub debounce: Duration,
}

impl WatcherConfig {
    /// Create a config with the default debounce.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, glob: StoryGlob) -> Self {
        Self {
            root: root.into(),
            glob,
            debounce: DEBOUNCE_DURATION,
        }
    }
}

type SharedDebouncer = Arc<Mutex<Option<Debouncer<RecommendedWatcher>>>>;

/// Watches the stories glob and emits add/change/unlink batches.
pub struct StoryWatcher {
    debouncer: SharedDebouncer,
    event_rx: mpsc::Receiver<EventBatch>,
    subscriptions: Arc<Mutex<Subscriptions>>,
    known: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl StoryWatcher {
    /// Start watching.
    ///
    /// `initial` is the file set resolved at startup; it decides whether a
    /// later write is an `add` or a `change`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a directory, the watcher cannot be
    /// created, or a directory cannot be watched.
    pub fn new(config: &WatcherConfig, initial: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        if !config.root.is_dir() {
            return Err(WatcherError::WatchFailed {
                path: config.root.display().to_string(),
                reason: "not a directory".to_string(),
            }
            .into());
        }

        let (batch_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let known = Arc::new(Mutex::new(initial.into_iter().collect::<BTreeSet<_>>()));
        let subscriptions = Arc::new(Mutex::new(Subscriptions::new(
            &config.root,
            config.glob.base_dir(&config.root),
        )));
        let debouncer: SharedDebouncer = Arc::new(Mutex::new(None));

        let known_clone = Arc::clone(&known);
        let subscriptions_clone = Arc::clone(&subscriptions);
        let debouncer_weak = Arc::downgrade(&debouncer);
        let root = config.root.clone();
        let glob = config.glob.clone();

        let mut inner = new_debouncer(
            config.debounce,
            move |result: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| {
                match result {
                    Ok(events) => {
                        let mut subscriptions = subscriptions_clone.lock();
                        if events.iter().any(|e| subscriptions.is_on_base_path(&e.path)) {
                            if let Some(debouncer) = debouncer_weak.upgrade() {
                                if let Some(debouncer) = debouncer.lock().as_mut() {
                                    if let Err(e) = subscriptions.sync(debouncer.watcher()) {
                                        tracing::warn!(error = %e, "Failed to re-arm story watch");
                                    }
                                }
                            }
                        }
                        drop(subscriptions);

                        let mut known = known_clone.lock();
                        let mut batch = EventBatch::new();
                        for event in events {
                            for story_event in
                                classify(&root, &glob, &event.path, &mut known)
                            {
                                batch.add(story_event);
                            }
                        }
                        drop(known);

                        if !batch.is_empty() && batch_tx.blocking_send(batch).is_err() {
                            tracing::debug!("Story event channel closed");
                        }
                    }
                    Err(e) => {
                        tracing::error!("Watch error: {:?}", e);
                    }
                }
            },
        )
        .map_err(|e| WatcherError::WatchFailed {
            path: "init".to_string(),
            reason: e.to_string(),
        })?;

        {
            let mut subscriptions = subscriptions.lock();
            subscriptions.sync(inner.watcher())?;
            *debouncer.lock() = Some(inner);

            tracing::info!(
                path = %subscriptions.watched_dir().display(),
                glob = config.glob.pattern(),
                "Watching stories"
            );
        }

        Ok(Self {
            debouncer,
            event_rx,
            subscriptions,
            known,
        })
    }

    /// Split off the event receiver, keeping the subscription alive in `self`.
    pub fn take_receiver(&mut self) -> mpsc::Receiver<EventBatch> {
        let (_, empty) = mpsc::channel(1);
        std::mem::replace(&mut self.event_rx, empty)
    }

    /// Directory currently observed for story changes: the glob base, or
    /// its nearest existing ancestor while the base is missing.
    #[must_use]
    pub fn watched_dir(&self) -> PathBuf {
        self.subscriptions.lock().watched_dir().to_path_buf()
    }

    /// Story files currently known to exist.
    #[must_use]
    pub fn known_files(&self) -> Vec<PathBuf> {
        self.known.lock().iter().cloned().collect()
    }
}

impl Drop for StoryWatcher {
    fn drop(&mut self) {
        self.debouncer.lock().take();
    }
}

/// Subscriptions that follow the glob base as it is created and removed.
///
/// The base is watched recursively while it exists. Its nearest existing
/// ancestor is watched non-recursively so that the base reappearing is
/// noticed.
#[derive(Debug)]
struct Subscriptions {
    root: PathBuf,
    base: PathBuf,
    anchor: Option<PathBuf>,
    base_armed: bool,
}

impl Subscriptions {
    fn new(root: &Path, base: PathBuf) -> Self {
        Self {
            root: root.to_path_buf(),
            base,
            anchor: None,
            base_armed: false,
        }
    }

    /// Nearest existing directory strictly above the base, if one is needed.
    fn anchor_target(&self) -> Option<PathBuf> {
        if self.base == self.root {
            return None;
        }
        self.base
            .ancestors()
            .skip(1)
            .find(|p| p.is_dir())
            .map(Path::to_path_buf)
    }

    /// Whether an event at `path` may change what should be watched.
    fn is_on_base_path(&self, path: &Path) -> bool {
        self.base.starts_with(path)
    }

    fn watched_dir(&self) -> &Path {
        match &self.anchor {
            Some(anchor) if !self.base_armed => anchor,
            _ => &self.base,
        }
    }

    /// Bring the subscriptions in line with what exists on disk.
    fn sync(&mut self, watcher: &mut dyn Watcher) -> Result<()> {
        let anchor = self.anchor_target();
        if anchor != self.anchor {
            if let Some(old) = self.anchor.take() {
                if let Err(e) = watcher.unwatch(&old) {
                    tracing::debug!(path = %old.display(), error = %e, "Unwatch failed");
                }
            }
            if let Some(dir) = &anchor {
                watcher
                    .watch(dir, RecursiveMode::NonRecursive)
                    .map_err(|e| watch_failed(dir, &e))?;
            }
            self.anchor = anchor;
        }

        let exists = self.base.is_dir();
        if exists && !self.base_armed {
            watcher
                .watch(&self.base, RecursiveMode::Recursive)
                .map_err(|e| watch_failed(&self.base, &e))?;
            self.base_armed = true;
            tracing::debug!(path = %self.base.display(), "Story base watched");
        } else if !exists && self.base_armed {
            if let Err(e) = watcher.unwatch(&self.base) {
                tracing::debug!(path = %self.base.display(), error = %e, "Unwatch failed");
            }
            self.base_armed = false;
            tracing::info!(path = %self.base.display(), "Story base removed");
        }

        Ok(())
    }
}

fn watch_failed(path: &Path, e: &notify::Error) -> WatcherError {
    WatcherError::WatchFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Turn one debounced path into story events, updating the known set.
///
/// A vanished path removes every known story at or below it, which covers
/// deleting a whole directory of stories. A directory that appears is
/// searched for stories not seen before.
pub(crate) fn classify(
    root: &Path,
    glob: &StoryGlob,
    path: &Path,
    known: &mut BTreeSet<PathBuf>,
) -> Vec<StoryEvent> {
    if path.is_file() {
        if !glob.accepts(root, path) {
            return Vec::new();
        }
        return if known.insert(path.to_path_buf()) {
            vec![StoryEvent::Added(path.to_path_buf())]
        } else {
            vec![StoryEvent::Changed(path.to_path_buf())]
        };
    }

    if path.is_dir() {
        return discover(root, glob, path, known);
    }

    let gone: Vec<PathBuf> = known
        .iter()
        .filter(|p| p.starts_with(path))
        .cloned()
        .collect();

    gone.into_iter()
        .map(|p| {
            known.remove(&p);
            StoryEvent::Removed(p)
        })
        .collect()
}

fn discover(
    root: &Path,
    glob: &StoryGlob,
    dir: &Path,
    known: &mut BTreeSet<PathBuf>,
) -> Vec<StoryEvent> {
    let base = glob.base_dir(root);
    let start = if dir.starts_with(&base) {
        dir
    } else if base.starts_with(dir) {
        base.as_path()
    } else {
        return Vec::new();
    };

    match resolve_story_files_in(root, glob, start) {
        Ok(files) => files
            .into_iter()
            .filter(|file| known.insert(file.clone()))
            .map(StoryEvent::Added)
            .collect(),
        Err(e) => {
            tracing::warn!(dir = %start.display(), error = %e, "Failed to scan directory");
            Vec::new()
        }
    }
}
