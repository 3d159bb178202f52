use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::EngageError;

/// Per-run pipeline configuration, fixed at `start()`.
///
/// Defaults mirror conservative production settings: a handful of posts per
/// channel, long jittered delays between actions, and a hard cap on how many
/// channels a single deployment will ever touch.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct EngageConfig {
    /// Minimum posts to act on per channel.
    #[builder(default = 1)]
    pub min_posts: u32,

    /// Maximum posts to act on per channel.
    #[builder(default = 5)]
    pub max_posts: u32,

    /// Lower bound of the jittered delay between actions, in seconds.
    #[builder(default = 20)]
    pub min_delay_secs: u64,

    /// Upper bound of the jittered delay between actions, in seconds.
    /// A `(0, 0)` range disables inter-action delays entirely.
    #[builder(default = 1000)]
    pub max_delay_secs: u64,

    /// Stop consuming new channels once this many have been processed.
    #[builder(default = 150)]
    pub max_channels: u64,

    /// Search keywords, crossed with `topics` by the discovery loop.
    #[builder(default)]
    pub keywords: Vec<String>,

    /// Topic dimensions, the outer axis of the search cross-product.
    #[builder(default)]
    pub topics: Vec<String>,

    /// Cool-down between full discovery passes, in seconds.
    #[builder(default = 3600)]
    pub pass_cooldown_secs: u64,
}

impl Default for EngageConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngageConfig {
    pub fn validate(&self) -> Result<(), EngageError> {
        if self.min_posts == 0 {
            return Err(EngageError::Config("min_posts must be at least 1".into()));
        }
        if self.min_posts > self.max_posts {
            return Err(EngageError::Config(format!(
                "post range is inverted: {}..{}",
                self.min_posts, self.max_posts
            )));
        }
        if self.min_delay_secs > self.max_delay_secs {
            return Err(EngageError::Config(format!(
                "delay range is inverted: {}..{}",
                self.min_delay_secs, self.max_delay_secs
            )));
        }
        Ok(())
    }

    /// `(0, 0)` means the operator turned inter-action delays off.
    pub fn delays_disabled(&self) -> bool {
        self.min_delay_secs == 0 && self.max_delay_secs == 0
    }
}
