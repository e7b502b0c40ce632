//! Sync scheduler - turns triggers and watcher events into reconciler work
//!
//! The [`SyncScheduler`] owns the session: one [`Reconciler`], one gate and
//! at most one timer. Every trigger goes through the gate, so two passes (or
//! a pass and a single-file operation) never run at the same time.
//!
//! ## Flow
//!
//! ```text
//! FileWatcher ──→ mpsc::Receiver ──→ debounce queue ──────┐
//! timer task ──────────────────────→ trigger_auto_timer ──┼─→ gate ─→ Reconciler
//! CLI / host ──────────────────────→ trigger_manual ──────┘
//! ```
//!
//! Full-pass triggers that find the gate taken are coalesced: the running
//! pass already covers them. File events wait for the gate instead, so a
//! save is never lost.
//!
//! Watcher events are held in a [`DebouncedChangeQueue`] until their path
//! has been quiet for [`SchedulerOptions::debounce`]. A save whose content
//! is exactly what the last pass downloaded is the pass's own write and is
//! not pushed back.

use std::{
    sync::{Arc, Mutex as StdMutex, PoisonError, Weak},
    time::Duration,
};

use anyhow::Result;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vaultsync_core::{config::SyncConfig, domain::VaultPath};

use crate::{
    reconciler::{FileAction, Reconciler, SyncReport},
    watcher::{ChangeEvent, DebouncedChangeQueue},
    SyncError,
};

/// Shortest accepted timer interval
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Longest accepted timer interval
pub const MAX_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// How often the event loop checks the debounce queue
const DEBOUNCE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Which triggers are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Push a file when it is saved
    pub sync_on_save: bool,
    /// Accept manual full passes
    pub manual_sync: bool,
    /// Quiet period a watched path needs before its change is dispatched
    pub debounce: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            sync_on_save: true,
            manual_sync: true,
            debounce: Duration::from_secs(2),
        }
    }
}

impl From<&SyncConfig> for SchedulerOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            sync_on_save: config.sync_on_save,
            manual_sync: config.manual_sync,
            debounce: Duration::from_secs(config.debounce_delay),
        }
    }
}

/// Bounds a timer interval to `MIN_INTERVAL..=MAX_INTERVAL`
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

// ============================================================================
// SyncScheduler
// ============================================================================

struct Inner {
    reconciler: Reconciler,
    /// Held for the whole of every pass and file operation
    gate: Mutex<()>,
    options: SchedulerOptions,
    timer: StdMutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}

/// Serializes all sync work for one session
///
/// Cheap to clone; clones share the gate, the reconciler and the timer.
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<Inner>,
}

impl SyncScheduler {
    /// Creates a scheduler around `reconciler`
    ///
    /// # Arguments
    /// * `reconciler` - Performs the actual passes and file operations
    /// * `options` - Which triggers are enabled
    pub fn new(reconciler: Reconciler, options: SchedulerOptions) -> Self {
        info!(
            sync_on_save = options.sync_on_save,
            manual_sync = options.manual_sync,
            debounce_ms = options.debounce.as_millis() as u64,
            mode = %reconciler.mode(),
            "Creating sync scheduler"
        );
        Self {
            inner: Arc::new(Inner {
                reconciler,
                gate: Mutex::new(()),
                options,
                timer: StdMutex::new(None),
            }),
        }
    }

    /// The enabled triggers
    pub fn options(&self) -> SchedulerOptions {
        self.inner.options
    }

    /// The reconciler every trigger runs through
    pub fn reconciler(&self) -> &Reconciler {
        &self.inner.reconciler
    }

    /// True while a pass or file operation holds the gate
    pub fn is_busy(&self) -> bool {
        self.inner.gate.try_lock().is_err()
    }

    // ========================================================================
    // Full-pass triggers
    // ========================================================================

    /// Runs a full pass on user request
    ///
    /// Returns `Ok(None)` when manual sync is disabled or another operation
    /// is running.
    pub async fn trigger_manual(&self) -> Result<Option<SyncReport>, SyncError> {
        if !self.inner.options.manual_sync {
            debug!("Manual sync disabled, ignoring trigger");
            return Ok(None);
        }
        self.full_pass("manual").await
    }

    /// Runs a full pass from the timer
    ///
    /// Returns `Ok(None)` when another operation is running.
    pub async fn trigger_auto_timer(&self) -> Result<Option<SyncReport>, SyncError> {
        self.full_pass("timer").await
    }

    async fn full_pass(&self, trigger: &'static str) -> Result<Option<SyncReport>, SyncError> {
        let Ok(_guard) = self.inner.gate.try_lock() else {
            info!(trigger, "Sync already in progress, skipping");
            return Ok(None);
        };
        debug!(trigger, "Running full pass");
        self.inner.reconciler.sync_vault().await.map(Some)
    }

    // ========================================================================
    // File triggers
    // ========================================================================

    /// Pushes a saved file
    ///
    /// Waits for any running operation. Returns `Ok(None)` when sync on save
    /// is disabled, or when the file still holds exactly what a pass just
    /// downloaded into it.
    pub async fn trigger_on_save(&self, path: &VaultPath) -> Result<Option<FileAction>> {
        if !self.inner.options.sync_on_save {
            debug!(path = %path, "Sync on save disabled, ignoring");
            return Ok(None);
        }
        let _guard = self.inner.gate.lock().await;
        let reconciler = &self.inner.reconciler;
        let file = reconciler.read_local(path).await?;
        if reconciler.consume_download_echo(&file) {
            debug!(path = %path, "Change is our own download, not pushing");
            return Ok(None);
        }
        let namespace = reconciler.namespace().await?;
        reconciler.sync_file(&namespace, &file).await.map(Some)
    }

    /// Mirrors a rename from `old_path` to `path`
    pub async fn trigger_on_rename(
        &self,
        path: &VaultPath,
        old_path: &VaultPath,
    ) -> Result<Option<FileAction>> {
        let _guard = self.inner.gate.lock().await;
        let reconciler = &self.inner.reconciler;
        let namespace = reconciler.namespace().await?;
        let file = reconciler.read_local(path).await?;
        reconciler
            .handle_rename(&namespace, &file, old_path)
            .await
            .map(Some)
    }

    /// Mirrors a delete of `path`
    pub async fn trigger_on_delete(&self, path: &VaultPath) -> Result<Option<FileAction>> {
        let _guard = self.inner.gate.lock().await;
        let reconciler = &self.inner.reconciler;
        let namespace = reconciler.namespace().await?;
        reconciler.handle_delete(&namespace, path).await.map(Some)
    }

    // ========================================================================
    // Timer
    // ========================================================================

    /// Starts timer-driven passes every `interval`, replacing any running timer
    ///
    /// The interval is bounded to one minute .. one hour. The first pass runs
    /// one interval from now.
    pub fn start_timer(&self, interval: Duration) {
        let interval = clamp_interval(interval);
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(timer_loop(weak, interval));

        let mut timer = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.replace(handle) {
            debug!("Replacing running sync timer");
            previous.abort();
        }
        info!(interval_secs = interval.as_secs(), "Sync timer started");
    }

    /// Stops the timer, if one is running
    pub fn stop_timer(&self) {
        let mut timer = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
            info!("Sync timer stopped");
        }
    }

    /// True if a timer task is alive
    pub fn timer_running(&self) -> bool {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Dispatches watcher events until the channel closes or `shutdown` fires
    ///
    /// Events are debounced per path, then handled one at a time in arrival
    /// order. Failures are logged and the loop continues. On exit, changes
    /// still waiting out their quiet period are dispatched and the timer is
    /// stopped.
    pub async fn run(&self, mut events: mpsc::Receiver<ChangeEvent>, shutdown: CancellationToken) {
        info!("Sync scheduler starting");
        let mut queue = DebouncedChangeQueue::new(self.inner.options.debounce);
        let mut poll = time::interval(DEBOUNCE_POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }

                _ = poll.tick(), if !queue.is_empty() => {
                    for change in queue.poll() {
                        self.dispatch(change).await;
                    }
                }

                event = events.recv() => {
                    match event {
                        Some(change) => queue.push(change),
                        None => {
                            info!("Change channel closed, scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        }

        let remaining = queue.flush();
        if !remaining.is_empty() {
            debug!(count = remaining.len(), "Dispatching pending changes before exit");
        }
        for change in remaining {
            self.dispatch(change).await;
        }

        self.stop_timer();
        info!("Sync scheduler stopped");
    }

    async fn dispatch(&self, event: ChangeEvent) {
        debug!(event = ?event, "Dispatching change event");
        let result = match &event {
            ChangeEvent::Modified(path) => self.trigger_on_save(path).await,
            ChangeEvent::Renamed { old, new } => self.trigger_on_rename(new, old).await,
            ChangeEvent::Deleted(path) => self.trigger_on_delete(path).await,
        };

        match result {
            Ok(Some(action)) => info!(path = %event.path(), %action, "File synced"),
            Ok(None) => {}
            Err(e) => warn!(path = %event.path(), error = %format!("{e:#}"), "File sync failed"),
        }
    }
}

async fn timer_loop(inner: Weak<Inner>, interval: Duration) {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            debug!("Scheduler dropped, timer exiting");
            break;
        };
        let scheduler = SyncScheduler { inner };
        match scheduler.trigger_auto_timer().await {
            Ok(Some(report)) => debug!(failures = report.failures.len(), "Timer pass finished"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Timer pass failed"),
        }
    }
}
