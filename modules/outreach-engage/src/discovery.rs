//! Discovery loop: walk the `topics × keywords` cross-product against the
//! search provider and hand eligible, unseen channels to the worker.
//!
//! The cursor is persisted *before* each pair executes, so a crash resumes
//! at the interrupted pair. Re-running that pair is harmless: the found set
//! dedups anything already handed off.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use outreach_common::EngageConfig;

use crate::context::PipelineContext;
use crate::eligibility::EligibilityFilter;
use crate::traits::{EngageEvent, SearchProvider};

/// Cool-down after a failed (topic, keyword) pair. The pair is not retried;
/// the loop moves on.
const PAIR_ERROR_COOLDOWN: Duration = Duration::from_secs(30);

pub struct DiscoveryLoop {
    ctx: Arc<PipelineContext>,
    search: Arc<dyn SearchProvider>,
    filter: EligibilityFilter,
    config: EngageConfig,
}

impl DiscoveryLoop {
    pub fn new(
        ctx: Arc<PipelineContext>,
        search: Arc<dyn SearchProvider>,
        filter: EligibilityFilter,
        config: EngageConfig,
    ) -> Self {
        Self {
            ctx,
            search,
            filter,
            config,
        }
    }

    pub async fn run(self) {
        info!(
            topics = self.config.topics.len(),
            keywords = self.config.keywords.len(),
            "Discovery loop started"
        );

        let mut first_search = true;
        'passes: while self.ctx.is_active() {
            let pairs = self.pairs();
            if pairs.is_empty() {
                warn!("No (topic, keyword) pairs configured, discovery is idle");
                if !self.sleep_pass_cooldown().await {
                    break;
                }
                continue;
            }

            let start_index = self.resume_index(&pairs);
            if start_index > 0 {
                info!(
                    topic = pairs[start_index].0.as_str(),
                    keyword = pairs[start_index].1.as_str(),
                    "Resuming discovery from persisted cursor"
                );
            }

            for (topic, keyword) in pairs.iter().skip(start_index) {
                if !self.ctx.is_active() {
                    break 'passes;
                }

                // Checkpoint before the unit starts.
                {
                    let mut cursor = self
                        .ctx
                        .cursor
                        .lock()
                        .unwrap_or_else(|e| e.into_inner());
                    *cursor = crate::progress::DiscoveryCursor::at(topic, keyword);
                }
                self.ctx.persist_cursor().await;

                if let Err(e) = self.run_pair(topic, keyword, &mut first_search).await {
                    warn!(topic = topic.as_str(), keyword = keyword.as_str(), error = %e, "Search pair failed, cooling down");
                    self.ctx.emit(EngageEvent::Error);
                    if !self.ctx.sleep_while_active(PAIR_ERROR_COOLDOWN).await {
                        break 'passes;
                    }
                    continue;
                }

                if let Some(delay) = self.jitter_delay() {
                    if !self.ctx.sleep_while_active(delay).await {
                        break 'passes;
                    }
                }
            }

            // Full pass complete: clear the cursor so the next pass starts
            // from the top, then cool down.
            self.ctx
                .cursor
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clear();
            self.ctx.persist_cursor().await;
            info!("Discovery pass complete, cooling down");
            if !self.sleep_pass_cooldown().await {
                break;
            }
        }

        // Final flush, then release the provider's driver. Close exactly once.
        self.ctx.persist_cursor().await;
        self.ctx.persist_found().await;
        if let Err(e) = self.search.close().await {
            warn!(error = %e, "Search provider close failed");
        }
        info!("Discovery loop stopped");
    }

    /// Deterministic cross-product order: topics outer, keywords inner.
    fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.config.topics.len() * self.config.keywords.len());
        for topic in &self.config.topics {
            for keyword in &self.config.keywords {
                pairs.push((topic.clone(), keyword.clone()));
            }
        }
        pairs
    }

    /// Where to resume. A cursor pointing at a pair no longer present in
    /// configuration restarts the pass from the beginning — non-fatal.
    fn resume_index(&self, pairs: &[(String, String)]) -> usize {
        let cursor = self
            .ctx
            .cursor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if cursor.is_empty() {
            return 0;
        }
        let position = pairs.iter().position(|(topic, keyword)| {
            cursor.topic.as_deref() == Some(topic) && cursor.keyword.as_deref() == Some(keyword)
        });
        match position {
            Some(index) => index,
            None => {
                warn!(
                    topic = cursor.topic.as_deref().unwrap_or(""),
                    keyword = cursor.keyword.as_deref().unwrap_or(""),
                    "Persisted cursor no longer matches configuration, restarting pass"
                );
                0
            }
        }
    }

    async fn run_pair(
        &self,
        topic: &str,
        keyword: &str,
        first_search: &mut bool,
    ) -> anyhow::Result<()> {
        // A failed search yields zero results for this pair; the caller
        // cools down and moves on. The session still counts as started.
        let result = self.search.search(keyword, topic, *first_search).await;
        *first_search = false;
        let candidates = result?;

        let mut seen_this_call = HashSet::new();
        for handle in candidates {
            if !self.ctx.is_active() {
                break;
            }
            if !seen_this_call.insert(handle.clone()) {
                continue;
            }
            if self
                .ctx
                .found
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .contains(&handle)
            {
                continue;
            }
            if self.ctx.is_processed(&handle) {
                continue;
            }
            if !self.filter.channel_eligible(&handle).await {
                continue;
            }

            self.ctx
                .found
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(handle.clone());
            self.ctx.persist_found().await;

            if !self.ctx.push_to_queue(handle.clone()).await {
                anyhow::bail!("hand-off queue rejected {handle}");
            }
            info!(channel = %handle, topic, keyword, "Discovered eligible channel");
        }
        Ok(())
    }

    fn jitter_delay(&self) -> Option<Duration> {
        if self.config.delays_disabled() {
            return None;
        }
        let secs = rand::rng()
            .random_range(self.config.min_delay_secs..=self.config.max_delay_secs);
        Some(Duration::from_secs(secs))
    }

    async fn sleep_pass_cooldown(&self) -> bool {
        self.ctx
            .sleep_while_active(Duration::from_secs(self.config.pass_cooldown_secs))
            .await
    }
}
