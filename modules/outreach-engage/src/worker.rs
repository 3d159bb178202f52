//! Engagement worker: consumes the hand-off queue and runs the fixed
//! per-channel action sequence — join, act on recent posts (comment where
//! the post allows it, react regardless), leave — under the shared retry
//! policy, checkpointing progress around every channel.

use std::sync::Arc;
use std::time::Duration;

use rand::prelude::IndexedRandom;
use rand::Rng;
use tracing::{error, info, warn};

use outreach_common::{ChannelHandle, EngageConfig, Post};

use crate::backoff::{RetryPolicy, Verdict};
use crate::context::PipelineContext;
use crate::eligibility::EligibilityFilter;
use crate::traits::{ChannelClient, ClientError, CommentGenerator, EngageEvent};

pub const POSITIVE_REACTIONS: [&str; 20] = [
    "👍", "❤️", "🔥", "🥰", "👏", "😍", "🤩", "🤝", "💯", "⭐", "🎉", "🙏", "💪", "👌", "✨",
    "💝", "🌟", "🏆", "🚀", "💎",
];

/// Posts shorter than this get no comment; there is nothing to reply to.
const MIN_POST_TEXT_CHARS: usize = 10;

/// Queue pop timeout — the worker's suspension point for observing stop.
const POP_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause while the processed-channel limit holds the queue closed.
const LIMIT_PAUSE: Duration = Duration::from_secs(60);

/// Cool-down after a failed channel before consuming the next one.
const ERROR_COOLDOWN: Duration = Duration::from_secs(30);

/// Settle time after joining before acting, and between a comment and its
/// reaction. Jittered.
const JOIN_SETTLE_SECS: (u64, u64) = (2, 5);
const COMMENT_SETTLE_SECS: (u64, u64) = (2, 8);

enum ChannelOutcome {
    /// The full sequence ran, individual action failures included.
    Completed,
    /// Metadata lookup failed outright. The channel is not marked processed
    /// and may be retried on a future enqueue.
    LookupFailed,
}

pub struct EngageWorker {
    ctx: Arc<PipelineContext>,
    client: Arc<dyn ChannelClient>,
    generator: Arc<dyn CommentGenerator>,
    filter: EligibilityFilter,
    policy: RetryPolicy,
    config: EngageConfig,
}

impl EngageWorker {
    pub fn new(
        ctx: Arc<PipelineContext>,
        client: Arc<dyn ChannelClient>,
        generator: Arc<dyn CommentGenerator>,
        filter: EligibilityFilter,
        policy: RetryPolicy,
        config: EngageConfig,
    ) -> Self {
        Self {
            ctx,
            client,
            generator,
            filter,
            policy,
            config,
        }
    }

    pub async fn run(self) {
        info!("Engagement worker started");

        while self.ctx.is_active() {
            // Channel cap: pause consumption without popping anything.
            if self.ctx.processed_count() as u64 >= self.config.max_channels {
                info!(
                    max_channels = self.config.max_channels,
                    "Channel limit reached, pausing queue consumption"
                );
                if !self.ctx.sleep_while_active(LIMIT_PAUSE).await {
                    break;
                }
                continue;
            }

            let Some(handle) = self.ctx.queue.pop_timeout(POP_TIMEOUT).await else {
                continue;
            };
            if !self.ctx.is_active() {
                break;
            }
            if self.ctx.is_processed(&handle) {
                info!(channel = %handle, "Already processed, dropping");
                continue;
            }

            match self.process_channel(&handle).await {
                ChannelOutcome::Completed => {
                    self.ctx
                        .processed
                        .write()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(handle.clone());
                    self.ctx.persist_processed().await;
                    {
                        let mut progress = self
                            .ctx
                            .progress
                            .lock()
                            .unwrap_or_else(|e| e.into_inner());
                        progress.processed_count += 1;
                        progress.current_channel = None;
                    }
                    self.ctx.persist_progress().await;
                    self.ctx.emit(EngageEvent::ChannelProcessed(handle.clone()));
                    info!(channel = %handle, "Channel processed");
                }
                ChannelOutcome::LookupFailed => {
                    self.ctx
                        .progress
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .current_channel = None;
                    self.ctx.persist_progress().await;
                    warn!(channel = %handle, "Channel left unprocessed, eligible for future reattempt");
                    if !self.ctx.sleep_while_active(ERROR_COOLDOWN).await {
                        break;
                    }
                }
            }

            if let Some(delay) = self.jitter_delay() {
                if !self.ctx.sleep_while_active(delay).await {
                    break;
                }
            }
        }

        // Final checkpoint flush on the way out.
        self.ctx.persist_progress().await;
        self.ctx.persist_processed().await;
        info!("Engagement worker stopped");
    }

    async fn process_channel(&self, handle: &ChannelHandle) -> ChannelOutcome {
        info!(channel = %handle, "Processing channel");

        // Checkpoint before the unit starts.
        {
            let mut progress = self
                .ctx
                .progress
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            progress.current_channel = Some(handle.clone());
        }
        self.ctx.persist_progress().await;

        let channel_info = match self.client.resolve(handle).await {
            Ok(channel_info) => channel_info,
            Err(e) => {
                error!(channel = %handle, error = %e, "Failed to resolve channel");
                self.ctx.emit(EngageEvent::Error);
                return ChannelOutcome::LookupFailed;
            }
        };
        info!(channel = %handle, title = channel_info.title.as_str(), "Resolved channel");

        // Join is tolerated-fail: some channels restrict joining but still
        // allow read and react.
        if !channel_info.is_member {
            match self.client.join(handle).await {
                Ok(()) => {
                    info!(channel = %handle, "Joined channel");
                    self.settle(JOIN_SETTLE_SECS).await;
                }
                Err(e) => warn!(channel = %handle, error = %e, "Join failed, continuing read-only"),
            }
        }

        let budget = rand::rng().random_range(self.config.min_posts..=self.config.max_posts);
        let posts = match self.client.recent_posts(handle, budget * 3).await {
            Ok(posts) => posts,
            Err(e) => {
                error!(channel = %handle, error = %e, "Failed to fetch recent posts");
                self.ctx.emit(EngageEvent::Error);
                Vec::new()
            }
        };

        let mut acted = 0u32;
        for post in &posts {
            if !self.ctx.is_active() {
                info!(channel = %handle, "Stop requested, aborting channel mid-sequence");
                break;
            }
            if acted >= budget {
                break;
            }

            self.engage_post(post).await;
            acted += 1;

            if let Some(delay) = self.jitter_delay() {
                if !self.ctx.sleep_while_active(delay).await {
                    break;
                }
            }
        }
        info!(channel = %handle, acted, budget, "Finished acting on posts");

        if let Err(e) = self.client.leave(handle).await {
            warn!(channel = %handle, error = %e, "Leave failed");
        } else {
            info!(channel = %handle, "Left channel");
        }

        ChannelOutcome::Completed
    }

    /// Act on one post: comment if the text is substantial and the post
    /// accepts comments, then always attempt a reaction.
    async fn engage_post(&self, post: &Post) {
        let text = post
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| text.chars().count() >= MIN_POST_TEXT_CHARS);

        match text {
            Some(text) if self.filter.post_eligible(post).await => {
                let comment = match self.generator.generate(text, &self.config.topics).await {
                    Ok(comment) => comment,
                    // Unreachable behind FallbackGenerator, which absorbs
                    // generation failures.
                    Err(e) => {
                        warn!(post = post.id, error = %e, "Generator failed past the fallback");
                        crate::generator::random_fallback().to_string()
                    }
                };
                if self.submit_comment_with_retry(post, &comment).await {
                    self.ctx.emit(EngageEvent::CommentSent);
                    self.settle(COMMENT_SETTLE_SECS).await;
                }
            }
            Some(_) => {
                info!(post = post.id, "Post does not accept comments, skipping comment");
            }
            None => {
                info!(post = post.id, "Post has no usable text, skipping comment");
            }
        }

        if self.react_with_retry(post).await {
            self.ctx.emit(EngageEvent::ReactionSet);
        }
    }

    async fn submit_comment_with_retry(&self, post: &Post, text: &str) -> bool {
        let mut failed = 0u32;
        loop {
            match self.client.submit_comment(post, text).await {
                Ok(()) => {
                    info!(post = post.id, preview = %text.chars().take(50).collect::<String>(), "Comment submitted");
                    return true;
                }
                // Terminal: the platform forbids writing here. Never retried.
                Err(ClientError::WriteForbidden) => {
                    warn!(post = post.id, "Writes forbidden, comment abandoned");
                    return false;
                }
                Err(ClientError::Throttled { wait_seconds }) => {
                    failed += 1;
                    match self
                        .policy
                        .next_delay(failed, Some(Duration::from_secs(wait_seconds)))
                    {
                        Verdict::RetryAfter(delay) => {
                            warn!(post = post.id, wait_seconds, "Throttled on comment, backing off");
                            if !self.ctx.sleep_while_active(delay).await {
                                return false;
                            }
                        }
                        Verdict::GiveUp => {
                            warn!(post = post.id, "Comment retries exhausted");
                            self.ctx.emit(EngageEvent::Error);
                            return false;
                        }
                    }
                }
                Err(e) => {
                    failed += 1;
                    match self.policy.next_delay(failed, None) {
                        Verdict::RetryAfter(delay) => {
                            error!(post = post.id, error = %e, attempt = failed, "Comment failed, retrying");
                            if !self.ctx.sleep_while_active(delay).await {
                                return false;
                            }
                        }
                        Verdict::GiveUp => {
                            error!(post = post.id, error = %e, "Comment failed, giving up");
                            self.ctx.emit(EngageEvent::Error);
                            return false;
                        }
                    }
                }
            }
        }
    }

    async fn react_with_retry(&self, post: &Post) -> bool {
        let mut failed = 0u32;
        loop {
            let emoji = POSITIVE_REACTIONS
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or(POSITIVE_REACTIONS[0]);
            match self.client.send_reaction(post, emoji).await {
                Ok(()) => {
                    info!(post = post.id, emoji, "Reaction set");
                    return true;
                }
                Err(ClientError::Throttled { wait_seconds }) => {
                    failed += 1;
                    match self
                        .policy
                        .next_delay(failed, Some(Duration::from_secs(wait_seconds)))
                    {
                        Verdict::RetryAfter(delay) => {
                            warn!(post = post.id, wait_seconds, "Throttled on reaction, backing off");
                            if !self.ctx.sleep_while_active(delay).await {
                                return false;
                            }
                        }
                        Verdict::GiveUp => {
                            warn!(post = post.id, "Reaction retries exhausted");
                            self.ctx.emit(EngageEvent::Error);
                            return false;
                        }
                    }
                }
                Err(e) => {
                    failed += 1;
                    match self.policy.next_delay(failed, None) {
                        Verdict::RetryAfter(delay) => {
                            warn!(post = post.id, error = %e, attempt = failed, "Reaction failed, retrying");
                            if !self.ctx.sleep_while_active(delay).await {
                                return false;
                            }
                        }
                        Verdict::GiveUp => {
                            warn!(post = post.id, error = %e, "Reaction failed, giving up");
                            self.ctx.emit(EngageEvent::Error);
                            return false;
                        }
                    }
                }
            }
        }
    }

    fn jitter_delay(&self) -> Option<Duration> {
        if self.config.delays_disabled() {
            return None;
        }
        let secs = rand::rng()
            .random_range(self.config.min_delay_secs..=self.config.max_delay_secs);
        Some(Duration::from_secs(secs))
    }

    async fn settle(&self, (min, max): (u64, u64)) {
        let secs = rand::rng().random_range(min..=max);
        self.ctx
            .sleep_while_active(Duration::from_secs(secs))
            .await;
    }
}
