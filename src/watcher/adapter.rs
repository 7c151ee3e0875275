//! Filesystem watch adapter built on `notify`.
//!
//! Turns notify callbacks into two independent tokio channels: one of
//! [`WatchEvent`]s and one of adapter-level errors. Both end when the adapter
//! is closed.

use std::fmt;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::error::WatchError;

/// What happened to a path. The orchestrator only cares that something changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOp {
    Create,
    Write,
    Remove,
    Rename,
    Other,
}

impl WatchOp {
    /// Classify a notify event kind. Access events carry no content change.
    fn from_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Access(_) => None,
            EventKind::Create(_) => Some(WatchOp::Create),
            EventKind::Modify(ModifyKind::Name(_)) => Some(WatchOp::Rename),
            EventKind::Modify(_) => Some(WatchOp::Write),
            EventKind::Remove(_) => Some(WatchOp::Remove),
            EventKind::Any | EventKind::Other => Some(WatchOp::Other),
        }
    }
}

impl fmt::Display for WatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatchOp::Create => "CREATE",
            WatchOp::Write => "WRITE",
            WatchOp::Remove => "REMOVE",
            WatchOp::Rename => "RENAME",
            WatchOp::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// A change reported for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub op: WatchOp,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, op: WatchOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.path.display())
    }
}

/// Flatten one notify event into per-path watch events.
fn split_event(event: Event) -> Vec<WatchEvent> {
    match WatchOp::from_kind(&event.kind) {
        Some(op) => event
            .paths
            .into_iter()
            .map(|path| WatchEvent { path, op })
            .collect(),
        None => Vec::new(),
    }
}

/// Monitors a fixed set of directories.
///
/// Shallow by default: only direct children of each directory are observed.
pub struct WatchAdapter {
    /// The underlying watcher; `None` once closed or when fed by plain channels.
    watcher: Option<notify::RecommendedWatcher>,
    events: mpsc::Receiver<WatchEvent>,
    errors: mpsc::Receiver<WatchError>,
    watched: Vec<PathBuf>,
}

impl WatchAdapter {
    /// Start watching every directory in `paths`.
    ///
    /// Fails on the first path that does not exist, is not a directory, or
    /// cannot be registered with the OS. No path is ever silently skipped.
    pub fn watch<I, P>(paths: I, recursive: bool, capacity: usize) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        let (error_tx, error_rx) = mpsc::channel(capacity.max(1));

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for watch_event in split_event(event) {
                    let _ = event_tx.blocking_send(watch_event);
                }
            }
            Err(e) => {
                let _ = error_tx.blocking_send(WatchError::EventError {
                    details: e.to_string(),
                });
            }
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        let mut watched = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                return Err(WatchError::PathWatchFailed {
                    path: path.to_path_buf(),
                    reason: "path does not exist".to_string(),
                });
            }
            if !path.is_dir() {
                return Err(WatchError::PathWatchFailed {
                    path: path.to_path_buf(),
                    reason: "not a directory".to_string(),
                });
            }
            watcher
                .watch(path, mode)
                .map_err(|e| WatchError::PathWatchFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            crate::debug_event!("watcher", "watching", "{}", path.display());
            watched.push(path.to_path_buf());
        }

        Ok(Self {
            watcher: Some(watcher),
            events: event_rx,
            errors: error_rx,
            watched,
        })
    }

    /// Build an adapter over pre-made channels, without touching the filesystem.
    ///
    /// Used to feed the orchestrator from another source of changes.
    pub fn from_channels(
        events: mpsc::Receiver<WatchEvent>,
        errors: mpsc::Receiver<WatchError>,
    ) -> Self {
        Self {
            watcher: None,
            events,
            errors,
            watched: Vec::new(),
        }
    }

    /// Directories registered with the OS watcher.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Both produced sequences, borrowed separately so they can be awaited together.
    pub fn streams(
        &mut self,
    ) -> (
        &mut mpsc::Receiver<WatchEvent>,
        &mut mpsc::Receiver<WatchError>,
    ) {
        (&mut self.events, &mut self.errors)
    }

    /// Stop monitoring. Both sequences end once their buffered items are drained.
    pub fn close(&mut self) {
        // Dropping the watcher unregisters every path and drops the senders
        self.watcher.take();
        self.events.close();
        self.errors.close();
    }

    pub fn is_closed(&self) -> bool {
        self.watcher.is_none()
    }
}

impl fmt::Debug for WatchAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchAdapter")
            .field("watched", &self.watched)
            .field("closed", &self.is_closed())
            .finish()
    }
}
