//! Run statistics: monotonic counters, atomic with respect to readers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::progress::EngageProgress;

/// Counters incremented by the worker and read by any observer. Never
/// decremented outside `reset()`.
#[derive(Debug, Default)]
pub struct EngageStats {
    comments_sent: AtomicU64,
    reactions_set: AtomicU64,
    channels_processed: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time view handed to external observers.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub comments_sent: u64,
    pub reactions_set: u64,
    pub channels_processed: u64,
    pub errors: u64,
    pub progress: EngageProgress,
    pub queue_depth: usize,
}

impl EngageStats {
    pub fn record_comment(&self) {
        self.comments_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reaction(&self) {
        self.reactions_set.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_channel(&self) {
        self.channels_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, progress: EngageProgress, queue_depth: usize) -> StatsSnapshot {
        StatsSnapshot {
            comments_sent: self.comments_sent.load(Ordering::Relaxed),
            reactions_set: self.reactions_set.load(Ordering::Relaxed),
            channels_processed: self.channels_processed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            progress,
            queue_depth,
        }
    }

    /// The explicit reset. The only path that decrements anything.
    pub fn reset(&self) {
        self.comments_sent.store(0, Ordering::Relaxed);
        self.reactions_set.store(0, Ordering::Relaxed);
        self.channels_processed.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}
