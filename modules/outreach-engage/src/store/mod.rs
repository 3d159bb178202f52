//! Durable key/value persistence for checkpoints and dedup sets.
//!
//! The pipeline treats persistence as opaque last-write-wins key/value
//! storage: no transactions across keys, no schema beyond JSON blobs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStateStore;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist a value. The last write for a key wins.
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<()>;

    /// Load a value, `None` if the key has never been written.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>>;
}
