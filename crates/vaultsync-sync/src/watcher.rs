//! Vault file watching
//!
//! Provides a [`FileWatcher`] that wraps the `notify` crate to monitor the
//! vault directory, converting raw OS events into vault-relative
//! [`ChangeEvent`] values for the [`SyncScheduler`](crate::scheduler::SyncScheduler).
//!
//! ## Architecture
//!
//! ```text
//! inotify / FSEvents / kqueue
//!       │
//!       ▼
//!  FileWatcher  ──→  mpsc::channel  ──→  DebouncedChangeQueue  ──→  SyncScheduler
//! ```
//!
//! A folder rename becomes one [`ChangeEvent::Renamed`] per file inside it.
//! Half-renames are reported as they arrive: the source side as
//! [`ChangeEvent::Deleted`], the destination side as
//! [`ChangeEvent::Modified`]. When the matching complete rename follows, the
//! [`DebouncedChangeQueue`] folds the halves into it.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use vaultsync_core::domain::VaultPath;

use crate::filesystem::is_ignored;

/// Capacity of the event channel
const CHANNEL_CAPACITY: usize = 1024;

/// A change to one vault file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The file was created or its content was saved
    Modified(VaultPath),
    /// The file was removed
    Deleted(VaultPath),
    /// The file was renamed or moved within the vault
    Renamed {
        /// The path before the rename
        old: VaultPath,
        /// The path after the rename
        new: VaultPath,
    },
}

impl ChangeEvent {
    /// Returns the current path of the file
    ///
    /// For rename events, this returns the new (destination) path.
    pub fn path(&self) -> &VaultPath {
        match self {
            ChangeEvent::Modified(p) | ChangeEvent::Deleted(p) => p,
            ChangeEvent::Renamed { new, .. } => new,
        }
    }
}

// ============================================================================
// FileWatcher
// ============================================================================

/// Watches the vault recursively using the OS-native mechanism
///
/// Dropping the watcher stops the watch and closes the channel.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Creates a watcher for the vault at `root`
    ///
    /// Returns the watcher and a receiver yielding [`ChangeEvent`]s. Nothing
    /// is reported until [`watch`](Self::watch) is called.
    ///
    /// # Errors
    /// Returns an error if the underlying OS watcher cannot be created
    pub fn new(root: impl Into<PathBuf>) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let root = root.into();
        let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>(CHANNEL_CAPACITY);
        let callback_root = root.clone();

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in map_notify_event(&callback_root, &event) {
                        if let Err(e) = event_tx.blocking_send(change) {
                            warn!(error = %e, "Failed to send change event (receiver dropped)");
                            break;
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok((Self { watcher, root }, event_rx))
    }

    /// Starts watching the vault root recursively
    ///
    /// # Errors
    /// Returns an error if the root cannot be watched (missing, permissions,
    /// or the inotify watch limit was reached)
    pub fn watch(&mut self) -> Result<()> {
        info!(root = %self.root.display(), "Starting recursive watch");
        self.watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch vault: {}", self.root.display()))
    }

    /// The watched vault root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

// ============================================================================
// Event mapping - notify::Event → ChangeEvent
// ============================================================================

/// Converts an absolute path into a vault path, `None` for paths outside
/// the vault or inside ignored entries
fn to_vault_path(root: &Path, path: &Path) -> Option<VaultPath> {
    let relative = path.strip_prefix(root).ok()?;
    let ignored = relative.components().any(|c| match c {
        Component::Normal(name) => name.to_str().map_or(true, is_ignored),
        _ => false,
    });
    if ignored {
        return None;
    }
    VaultPath::from_relative(relative).ok()
}

/// Regular files below `dir`, relative to it, skipping ignored entries
fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative) = pending.pop() {
        let entries = match std::fs::read_dir(dir.join(&relative)) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.join(&relative).display(), error = %e, "Failed to scan moved folder");
                continue;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_str().map_or(true, is_ignored) {
                continue;
            }
            let child = relative.join(&name);
            match entry.file_type() {
                Ok(t) if t.is_dir() => pending.push(child),
                Ok(t) if t.is_file() => files.push(child),
                _ => {}
            }
        }
    }

    files.sort();
    files
}

/// `Modified` for a file that appeared at `path`, or for every file of a
/// folder that appeared there
fn appeared(root: &Path, path: &Path) -> Vec<ChangeEvent> {
    if path.is_dir() {
        files_under(path)
            .iter()
            .filter_map(|relative| to_vault_path(root, &path.join(relative)))
            .map(ChangeEvent::Modified)
            .collect()
    } else {
        to_vault_path(root, path)
            .map(ChangeEvent::Modified)
            .into_iter()
            .collect()
    }
}

/// One file moved from `old` to `new`; either side may be outside the vault
fn moved(root: &Path, old: &Path, new: &Path) -> Option<ChangeEvent> {
    match (to_vault_path(root, old), to_vault_path(root, new)) {
        (Some(old), Some(new)) => Some(ChangeEvent::Renamed { old, new }),
        (None, Some(new)) => Some(ChangeEvent::Modified(new)),
        (Some(old), None) => Some(ChangeEvent::Deleted(old)),
        (None, None) => None,
    }
}

/// Converts a `notify::Event` into [`ChangeEvent`]s
///
/// - `Create(File | Any)`, `Modify(Data | Any | Other)` → `Modified`
/// - `Modify(Name(Both))` → `Renamed`; if only one side is a vault file,
///   `Modified` (moved in, e.g. an atomic write) or `Deleted` (moved away).
///   A folder rename yields one event per file inside it.
/// - `Modify(Name(From))` → `Deleted`, `Modify(Name(To))` → `Modified`
/// - `Modify(Name(Any))` → `Modified` if the path still exists, else `Deleted`
/// - `Remove(File | Folder | Any)` → `Deleted`
///
/// Metadata changes and access events map to nothing.
fn map_notify_event(root: &Path, event: &notify::Event) -> Vec<ChangeEvent> {
    let paths = &event.paths;
    let Some(first) = paths.first() else {
        return Vec::new();
    };

    let changes: Vec<ChangeEvent> = match &event.kind {
        EventKind::Create(CreateKind::File | CreateKind::Folder | CreateKind::Any) => {
            appeared(root, first)
        }

        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
            if first.is_dir() {
                return Vec::new();
            }
            appeared(root, first)
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            let (old, new) = (&paths[0], &paths[1]);
            if new.is_dir() {
                files_under(new)
                    .iter()
                    .filter_map(|relative| moved(root, &old.join(relative), &new.join(relative)))
                    .collect()
            } else {
                moved(root, old, new).into_iter().collect()
            }
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => to_vault_path(root, first)
            .map(ChangeEvent::Deleted)
            .into_iter()
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => appeared(root, first),

        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            if first.exists() {
                appeared(root, first)
            } else {
                to_vault_path(root, first)
                    .map(ChangeEvent::Deleted)
                    .into_iter()
                    .collect()
            }
        }

        EventKind::Remove(RemoveKind::File | RemoveKind::Folder | RemoveKind::Any) => {
            to_vault_path(root, first)
                .map(ChangeEvent::Deleted)
                .into_iter()
                .collect()
        }

        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            return Vec::new();
        }
    };

    for change in &changes {
        debug!(event = ?change, "Mapped watcher event");
    }
    changes
}

// ============================================================================
// DebouncedChangeQueue
// ============================================================================

/// Queue that coalesces rapid vault changes into settled events
///
/// Events for the same path are merged and the path's quiet period is
/// restarted. An event is only emitted by [`poll`](Self::poll) once its path
/// has been quiet for the debounce delay.
///
/// Merging rules:
/// - `Modified` after `Deleted` revives the file; `Modified` after
///   `Renamed` keeps the rename (the rename pushes content anyway).
/// - `Renamed { old, new }` absorbs anything pending for `old` (the
///   `Deleted` half of the same move) and for `new` (the `Modified` half).
///   A pending rename into `old` is chained, so `a → b → c` becomes
///   `a → c`. A pending `Deleted` for a folder containing `old` is dropped.
/// - `Deleted` after `Renamed { old, .. }` becomes `Deleted(old)`.
pub struct DebouncedChangeQueue {
    /// Pending changes in arrival order, with the time each was last touched
    pending: Vec<(ChangeEvent, Instant)>,
    /// Minimum quiet period before a change is considered settled
    debounce_delay: Duration,
}

impl DebouncedChangeQueue {
    /// Creates a queue that holds each path for `debounce_delay`
    pub fn new(debounce_delay: Duration) -> Self {
        Self {
            pending: Vec::new(),
            debounce_delay,
        }
    }

    fn take(&mut self, path: &VaultPath) -> Option<ChangeEvent> {
        let index = self.pending.iter().position(|(e, _)| e.path() == path)?;
        Some(self.pending.remove(index).0)
    }

    /// Inserts or merges a change event, restarting its quiet period
    pub fn push(&mut self, event: ChangeEvent) {
        debug!(event = ?event, "Enqueuing change event");
        let now = Instant::now();

        match event {
            ChangeEvent::Modified(path) => {
                match self.pending.iter_mut().find(|(e, _)| e.path() == &path) {
                    Some((existing, seen)) => {
                        if !matches!(existing, ChangeEvent::Renamed { .. }) {
                            *existing = ChangeEvent::Modified(path);
                        }
                        *seen = now;
                    }
                    None => self.pending.push((ChangeEvent::Modified(path), now)),
                }
            }

            ChangeEvent::Deleted(path) => {
                let event = match self.take(&path) {
                    Some(ChangeEvent::Renamed { old, .. }) => ChangeEvent::Deleted(old),
                    _ => ChangeEvent::Deleted(path),
                };
                self.pending.push((event, now));
            }

            ChangeEvent::Renamed { old, new } => {
                let origin = match self.take(&old) {
                    Some(ChangeEvent::Renamed { old: origin, .. }) => origin,
                    _ => old,
                };
                self.pending.retain(|(e, _)| match e {
                    ChangeEvent::Deleted(folder) => {
                        !origin.as_str().starts_with(&format!("{folder}/"))
                    }
                    _ => true,
                });
                self.take(&new);

                let event = if origin == new {
                    ChangeEvent::Modified(new)
                } else {
                    ChangeEvent::Renamed { old: origin, new }
                };
                self.pending.push((event, now));
            }
        }
    }

    /// Removes and returns every change whose path has been quiet for the
    /// debounce delay, in arrival order
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let now = Instant::now();
        let delay = self.debounce_delay;
        let (settled, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|(_, seen)| now.duration_since(*seen) >= delay);
        self.pending = waiting;

        if !settled.is_empty() {
            debug!(count = settled.len(), "Polled settled change events");
        }
        settled.into_iter().map(|(event, _)| event).collect()
    }

    /// Removes and returns every pending change, settled or not
    pub fn flush(&mut self) -> Vec<ChangeEvent> {
        self.pending.drain(..).map(|(event, _)| event).collect()
    }

    /// Returns the number of pending (unsettled) events
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if there are no pending events
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
