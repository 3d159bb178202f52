//! Pipeline control surface: start, stop, enqueue, statistics.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use outreach_common::{ChannelHandle, EngageConfig, EngageError};

use crate::backoff::RetryPolicy;
use crate::context::PipelineContext;
use crate::discovery::DiscoveryLoop;
use crate::eligibility::EligibilityFilter;
use crate::generator::FallbackGenerator;
use crate::progress::EngageProgress;
use crate::stats::StatsSnapshot;
use crate::store::StateStore;
use crate::traits::{ChannelClient, CommentGenerator, EngageObserver, NoopObserver, SearchProvider};
use crate::worker::EngageWorker;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// One discovery-to-engagement pipeline instance.
///
/// Owns the shared [`PipelineContext`] and the collaborator handles; spawns
/// the discovery loop and the engagement worker as independent tasks on
/// `start()` and joins them on `stop()`. Instances are fully independent —
/// tests run several side by side against separate stores.
pub struct Pipeline {
    ctx: Arc<PipelineContext>,
    search: Arc<dyn SearchProvider>,
    client: Arc<dyn ChannelClient>,
    generator: Arc<dyn CommentGenerator>,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Pipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        client: Arc<dyn ChannelClient>,
        generator: Arc<dyn CommentGenerator>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self::with_observer(
            search,
            client,
            generator,
            store,
            Arc::new(NoopObserver),
            DEFAULT_QUEUE_CAPACITY,
        )
    }

    pub fn with_observer(
        search: Arc<dyn SearchProvider>,
        client: Arc<dyn ChannelClient>,
        generator: Arc<dyn CommentGenerator>,
        store: Arc<dyn StateStore>,
        observer: Arc<dyn EngageObserver>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            ctx: Arc::new(PipelineContext::new(store, observer, queue_capacity)),
            search,
            client,
            generator,
            tasks: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Start both loops. Rejects if already running; reloads persisted
    /// state first so both loops resume where the last run stopped.
    pub async fn start(&self, config: EngageConfig) -> Result<(), EngageError> {
        config.validate()?;
        if !self.ctx.activate() {
            warn!("Start requested but pipeline is already running");
            return Err(EngageError::AlreadyRunning);
        }

        info!(
            keywords = config.keywords.len(),
            topics = config.topics.len(),
            max_channels = config.max_channels,
            "Starting pipeline"
        );
        self.ctx.load_persisted().await;

        let filter = EligibilityFilter::new(self.client.clone());
        let discovery = DiscoveryLoop::new(
            self.ctx.clone(),
            self.search.clone(),
            filter.clone(),
            config.clone(),
        );
        let worker = EngageWorker::new(
            self.ctx.clone(),
            self.client.clone(),
            Arc::new(FallbackGenerator::new(self.generator.clone())),
            filter,
            RetryPolicy::default(),
            config,
        );

        let mut tasks = self.tasks.lock().await;
        tasks.push(tokio::spawn(discovery.run()));
        tasks.push(tokio::spawn(worker.run()));
        Ok(())
    }

    /// Cooperative stop: clear the flag, join both loops (each flushes its
    /// own checkpoints on the way out), then discard queued work.
    pub async fn stop(&self) {
        info!("Stopping pipeline");
        self.ctx.deactivate();

        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            if let Err(e) = task.await {
                error!(error = %e, "Pipeline task panicked");
            }
        }

        let dropped = self.ctx.queue.drain().await;
        info!(dropped, "Pipeline stopped");
    }

    /// Hand a channel to the worker directly. No-op for channels already
    /// processed. Returns whether the handle was queued.
    pub async fn enqueue(&self, handle: ChannelHandle) -> bool {
        if self.ctx.is_processed(&handle) {
            info!(channel = %handle, "Already processed, not enqueueing");
            return false;
        }
        let queued = self.ctx.push_to_queue(handle.clone()).await;
        if queued {
            info!(channel = %handle, "Channel enqueued");
        } else {
            warn!(channel = %handle, "Enqueue rejected");
        }
        queued
    }

    pub fn statistics(&self) -> StatsSnapshot {
        let progress = self
            .ctx
            .progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        self.ctx.stats.snapshot(progress, self.ctx.queue.depth())
    }

    /// Zero the counters and the progress record. Dedup sets are untouched;
    /// they carry dedup authority across resets.
    pub fn reset_statistics(&self) {
        self.ctx.stats.reset();
        *self
            .ctx
            .progress
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = EngageProgress::default();
        info!("Statistics reset");
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_active()
    }

    /// Shared context, for tests and embedders that need direct state access.
    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.ctx
    }
}
