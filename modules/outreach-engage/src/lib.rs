//! Discovery-to-engagement pipeline.
//!
//! A discovery loop walks a `topics × keywords` cross-product against an
//! external search provider, filters candidates for an attached discussion
//! surface, and hands eligible channels to an engagement worker over a
//! bounded queue. The worker runs a fixed action sequence per channel
//! (join, comment on recent posts, react, leave) under a shared retry
//! policy, checkpointing progress so both loops resume after a restart
//! without repeating completed work.
//!
//! All platform specifics live behind the traits in [`traits`]; the
//! pipeline itself only knows about handles, posts, and throttle signals.

pub mod backoff;
pub mod context;
pub mod discovery;
pub mod eligibility;
pub mod generator;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod stats;
pub mod store;
pub mod traits;
pub mod worker;

pub use backoff::{RetryPolicy, Verdict};
pub use context::PipelineContext;
pub use discovery::DiscoveryLoop;
pub use eligibility::EligibilityFilter;
pub use generator::{FallbackGenerator, HttpGenerator};
pub use pipeline::Pipeline;
pub use progress::{DiscoveryCursor, EngageProgress};
pub use stats::{EngageStats, StatsSnapshot};
pub use store::{MemoryStore, PgStateStore, StateStore};
pub use traits::{
    ChannelClient, ClientError, CommentGenerator, EngageEvent, EngageObserver, NoopObserver,
    SearchProvider,
};
pub use worker::EngageWorker;
