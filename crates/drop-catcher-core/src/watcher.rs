use glob::Pattern;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

use crate::error::Error;
use crate::storage::MoveRecordStore;
use crate::IngestionPipeline;

const TRANSIENT_SUFFIXES: [&str; 2] = [".swp", ".part"];

/// Decides which created entries are worth dispatching. Editor swap files,
/// partial downloads and hidden files are always skipped.
#[derive(Debug, Default)]
pub struct NameFilter {
    ignore_patterns: Vec<Pattern>,
}

impl NameFilter {
    pub fn new(ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        Self { ignore_patterns }
    }

    pub fn accepts(&self, name: &str) -> bool {
        !name.starts_with('.')
            && !TRANSIENT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
            && !self.ignore_patterns.iter().any(|pattern| pattern.matches(name))
    }
}

/// Closes a watch subscription from any thread. Events still queued when the
/// handle closes are dropped; only the dispatch in flight runs to completion.
#[derive(Clone)]
pub struct WatchHandle {
    subscription: Arc<Mutex<Option<RecommendedWatcher>>>,
    closed: Arc<AtomicBool>,
}

impl WatchHandle {
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let watcher = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if watcher.is_some() {
            info!("Closing watch subscription");
        }
        // Dropping the watcher stops its event thread, which drops the sender
        // and wakes a loop blocked on an empty queue.
        drop(watcher);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Non-recursive watch on the input directory feeding created files, one at a
/// time, into the pipeline.
pub struct DirectoryWatcher {
    input_dir: PathBuf,
    filter: NameFilter,
    events: Receiver<notify::Result<Event>>,
    closed: Arc<AtomicBool>,
}

impl DirectoryWatcher {
    pub fn subscribe(input_dir: &Path, filter: NameFilter) -> Result<(Self, WatchHandle), Error> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
        watcher.watch(input_dir, RecursiveMode::NonRecursive)?;
        info!("Watching {}", input_dir.display());

        let (directory_watcher, handle) = Self::from_channel(input_dir, filter, rx);
        *handle
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(watcher);
        Ok((directory_watcher, handle))
    }

    /// Build a watcher over an existing event channel. The loop ends when the
    /// returned handle is closed or every sender is gone.
    pub fn from_channel(
        input_dir: &Path,
        filter: NameFilter,
        events: Receiver<notify::Result<Event>>,
    ) -> (Self, WatchHandle) {
        let closed = Arc::new(AtomicBool::new(false));
        let handle = WatchHandle {
            subscription: Arc::new(Mutex::new(None)),
            closed: closed.clone(),
        };
        let watcher = Self {
            input_dir: input_dir.to_path_buf(),
            filter,
            events,
            closed,
        };
        (watcher, handle)
    }

    pub fn run<S: MoveRecordStore>(&self, pipeline: &IngestionPipeline<S>) {
        self.run_with(|path| pipeline.handle(path).map(|_| ()))
    }

    /// Block on events until the subscription is closed, dispatching each
    /// accepted path synchronously. Dispatch errors are logged and the loop
    /// carries on.
    pub fn run_with<F>(&self, mut dispatch: F)
    where
        F: FnMut(&Path) -> Result<(), Error>,
    {
        loop {
            if self.stop_requested() {
                return;
            }
            let event = match self.events.recv() {
                Ok(Ok(event)) => event,
                Ok(Err(e)) => {
                    error!("Watcher interrupted: {}", e);
                    continue;
                }
                Err(mpsc::RecvError) => {
                    info!("Watch service closed, shutting down");
                    return;
                }
            };

            for path in self.created_entries(&event) {
                if self.stop_requested() {
                    return;
                }
                if let Err(e) = dispatch(&path) {
                    error!("Failed to handle {}: {}", path.display(), e);
                }
            }
        }
    }

    fn stop_requested(&self) -> bool {
        let closed = self.closed.load(Ordering::SeqCst);
        if closed {
            info!("Watch subscription closed, dropping queued events");
        }
        closed
    }

    fn created_entries(&self, event: &Event) -> Vec<PathBuf> {
        if !is_entry_created(&event.kind) {
            return Vec::new();
        }
        event
            .paths
            .iter()
            .filter_map(|path| path.file_name()?.to_str())
            .filter(|name| {
                let accepted = self.filter.accepts(name);
                if !accepted {
                    debug!("Skipping transient entry {}", name);
                }
                accepted
            })
            .map(|name| self.input_dir.join(name))
            .collect()
    }
}

/// New files and files renamed into the directory both count as created.
fn is_entry_created(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}
