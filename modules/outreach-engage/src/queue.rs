//! Bounded hand-off queue between discovery and the engagement worker.
//!
//! A thin wrapper over a tokio mpsc channel that adds a depth gauge and a
//! cancellable, backpressuring push: when the queue is full, the sender
//! waits in one-second slices and re-checks the pipeline's active flag, so
//! a full queue throttles discovery without wedging shutdown.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use outreach_common::ChannelHandle;

pub struct HandoffQueue {
    tx: mpsc::Sender<ChannelHandle>,
    rx: Mutex<mpsc::Receiver<ChannelHandle>>,
    depth: AtomicUsize,
}

impl HandoffQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
            depth: AtomicUsize::new(0),
        }
    }

    /// Push a handle, waiting for capacity. Returns false if the queue is
    /// closed or `active` clears while waiting.
    pub async fn push(&self, handle: ChannelHandle, active: &AtomicBool) -> bool {
        loop {
            match tokio::time::timeout(Duration::from_secs(1), self.tx.reserve()).await {
                Ok(Ok(permit)) => {
                    permit.send(handle);
                    self.depth.fetch_add(1, Ordering::SeqCst);
                    return true;
                }
                Ok(Err(_)) => return false,
                Err(_) => {
                    if !active.load(Ordering::SeqCst) {
                        return false;
                    }
                }
            }
        }
    }

    /// Pop the next handle, or `None` if the timeout elapses first. The
    /// timeout is the worker's suspension point for observing `stop()`.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<ChannelHandle> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(handle)) => {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                Some(handle)
            }
            _ => None,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Discard everything currently queued. Returns how many were dropped.
    pub async fn drain(&self) -> usize {
        let mut rx = self.rx.lock().await;
        let mut dropped = 0;
        while rx.try_recv().is_ok() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            dropped += 1;
        }
        dropped
    }
}
