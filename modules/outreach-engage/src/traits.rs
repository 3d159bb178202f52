// Trait abstractions for the pipeline's external collaborators.
//
// SearchProvider — enumerates candidate channels for a (keyword, topic) pair.
// ChannelClient — everything the worker does against the content platform.
// CommentGenerator — turns a post into reply text.
// EngageObserver — side channel for statistics consumers, injected at
//   construction instead of reached for dynamically.
//
// These enable deterministic testing with in-memory mocks: no network,
// no live platform account. `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use outreach_common::{ChannelHandle, ChannelInfo, Post};

/// How a platform call failed. Throttling carries the provider's wait hint
/// so the retry policy can honor it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("throttled, retry after {wait_seconds}s")]
    Throttled { wait_seconds: u64 },

    #[error("writes are forbidden here")]
    WriteForbidden,

    #[error("channel unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

// ---------------------------------------------------------------------------
// SearchProvider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for channels matching a (keyword, topic) pair. An empty list is
    /// a normal outcome. `first_in_session` is true only for the first call
    /// after `start()`, letting driver-backed providers warm up lazily.
    async fn search(
        &self,
        keyword: &str,
        topic: &str,
        first_in_session: bool,
    ) -> Result<Vec<ChannelHandle>>;

    /// Release any held driver resource. Called exactly once when the
    /// discovery loop exits; implementations must tolerate being already
    /// closed.
    async fn close(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// ChannelClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// Resolve channel metadata.
    async fn resolve(&self, handle: &ChannelHandle) -> ClientResult<ChannelInfo>;

    /// Join/subscribe to a channel.
    async fn join(&self, handle: &ChannelHandle) -> ClientResult<()>;

    /// Leave/unsubscribe from a channel.
    async fn leave(&self, handle: &ChannelHandle) -> ClientResult<()>;

    /// Most recent posts, newest first, up to `limit`.
    async fn recent_posts(&self, handle: &ChannelHandle, limit: u32) -> ClientResult<Vec<Post>>;

    /// Submit a comment under a post.
    async fn submit_comment(&self, post: &Post, text: &str) -> ClientResult<()>;

    /// Send a reaction to a post.
    async fn send_reaction(&self, post: &Post, emoji: &str) -> ClientResult<()>;

    /// Whether the channel has an attached discussion surface at all.
    async fn has_discussion_group(&self, handle: &ChannelHandle) -> ClientResult<bool>;

    /// Whether this specific post accepts comments.
    async fn post_supports_comments(&self, post: &Post) -> ClientResult<bool>;
}

// ---------------------------------------------------------------------------
// CommentGenerator
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CommentGenerator: Send + Sync {
    /// Generate reply text for a post. Callers wrap this in
    /// [`FallbackGenerator`](crate::generator::FallbackGenerator), so
    /// failures here never reach the worker.
    async fn generate(&self, post_text: &str, topics: &[String]) -> Result<String>;
}

// ---------------------------------------------------------------------------
// EngageObserver
// ---------------------------------------------------------------------------

/// Pipeline milestones, for external statistics consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngageEvent {
    CommentSent,
    ReactionSet,
    ChannelProcessed(ChannelHandle),
    Error,
}

/// Observer injected at pipeline construction. A failing observer is logged
/// and skipped for that event; it never stalls the pipeline.
pub trait EngageObserver: Send + Sync {
    fn notify(&self, event: &EngageEvent) -> Result<()>;
}

/// Default observer: discards everything.
pub struct NoopObserver;

impl EngageObserver for NoopObserver {
    fn notify(&self, _event: &EngageEvent) -> Result<()> {
        Ok(())
    }
}
