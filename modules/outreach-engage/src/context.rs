//! Shared pipeline context.
//!
//! One explicit object holding the active flag, the hand-off queue, the
//! dedup sets, progress records, and statistics. Both loops receive an
//! `Arc<PipelineContext>`, so multiple independent pipelines can run in the
//! same process — there is no module-level state anywhere.
//!
//! Ownership discipline: discovery mutates `found` and `cursor`, the worker
//! mutates `processed` and `progress`. Nothing else writes those aggregates,
//! so plain `RwLock`/`Mutex` guards held only for short synchronous sections
//! are enough.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tracing::warn;

use outreach_common::ChannelHandle;

use crate::progress::{
    load_state, save_state, DiscoveryCursor, EngageProgress, KEY_DISCOVERY_CURSOR,
    KEY_ENGAGE_PROGRESS, KEY_FOUND, KEY_PROCESSED,
};
use crate::queue::HandoffQueue;
use crate::stats::EngageStats;
use crate::store::StateStore;
use crate::traits::{EngageEvent, EngageObserver};

pub struct PipelineContext {
    active: AtomicBool,
    pub queue: HandoffQueue,
    pub processed: RwLock<HashSet<ChannelHandle>>,
    pub found: RwLock<HashSet<ChannelHandle>>,
    pub progress: Mutex<EngageProgress>,
    pub cursor: Mutex<DiscoveryCursor>,
    pub stats: EngageStats,
    pub store: Arc<dyn StateStore>,
    observer: Arc<dyn EngageObserver>,
}

impl PipelineContext {
    pub fn new(
        store: Arc<dyn StateStore>,
        observer: Arc<dyn EngageObserver>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            active: AtomicBool::new(false),
            queue: HandoffQueue::new(queue_capacity),
            processed: RwLock::new(HashSet::new()),
            found: RwLock::new(HashSet::new()),
            progress: Mutex::new(EngageProgress::default()),
            cursor: Mutex::new(DiscoveryCursor::default()),
            stats: EngageStats::default(),
            store,
            observer,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Flip idle → running. False if already running.
    pub fn activate(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Reload all four persisted aggregates. Called on `start()`, before the
    /// loops spawn, so resumption state is in place before any work begins.
    pub async fn load_persisted(&self) {
        let progress: EngageProgress = load_state(&*self.store, KEY_ENGAGE_PROGRESS).await;
        let cursor: DiscoveryCursor = load_state(&*self.store, KEY_DISCOVERY_CURSOR).await;
        let processed: HashSet<ChannelHandle> = load_state(&*self.store, KEY_PROCESSED).await;
        let found: HashSet<ChannelHandle> = load_state(&*self.store, KEY_FOUND).await;

        *self.progress.lock().unwrap_or_else(|e| e.into_inner()) = progress;
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner()) = cursor;
        *self.processed.write().unwrap_or_else(|e| e.into_inner()) = processed;
        *self.found.write().unwrap_or_else(|e| e.into_inner()) = found;
    }

    pub async fn persist_progress(&self) {
        let snapshot = self
            .progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        save_state(&*self.store, KEY_ENGAGE_PROGRESS, &snapshot).await;
    }

    pub async fn persist_cursor(&self) {
        let snapshot = self
            .cursor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        save_state(&*self.store, KEY_DISCOVERY_CURSOR, &snapshot).await;
    }

    pub async fn persist_processed(&self) {
        let snapshot = self
            .processed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        save_state(&*self.store, KEY_PROCESSED, &snapshot).await;
    }

    pub async fn persist_found(&self) {
        let snapshot = self
            .found
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        save_state(&*self.store, KEY_FOUND, &snapshot).await;
    }

    pub fn is_processed(&self, handle: &ChannelHandle) -> bool {
        self.processed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(handle)
    }

    pub fn processed_count(&self) -> usize {
        self.processed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub async fn push_to_queue(&self, handle: ChannelHandle) -> bool {
        self.queue.push(handle, &self.active).await
    }

    /// Record a milestone: bump the matching counter, then forward to the
    /// injected observer. Observer failures are logged and skipped.
    pub fn emit(&self, event: EngageEvent) {
        match &event {
            EngageEvent::CommentSent => self.stats.record_comment(),
            EngageEvent::ReactionSet => self.stats.record_reaction(),
            EngageEvent::ChannelProcessed(_) => self.stats.record_channel(),
            EngageEvent::Error => self.stats.record_error(),
        }
        if let Err(e) = self.observer.notify(&event) {
            warn!(?event, error = %e, "Observer rejected event");
        }
    }

    /// Sleep in one-second slices, re-checking the active flag between
    /// slices so `stop()` is observed promptly. True if the full duration
    /// elapsed, false if deactivated early.
    pub async fn sleep_while_active(&self, duration: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            if !self.is_active() {
                return false;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return true;
            }
            let slice = (deadline - now).min(Duration::from_secs(1));
            tokio::time::sleep(slice).await;
        }
    }
}
