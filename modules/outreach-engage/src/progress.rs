//! Checkpoint records and their persistence helpers.
//!
//! Checkpoints describe either a completed unit of work or one about to
//! start: the writer persists *before* the unit runs and overwrites after
//! it completes, so a reader recovering state never lands mid-unit.
//!
//! Persistence failures are logged and absorbed — in-memory state stays
//! authoritative for the rest of the run, and the next successful save
//! overwrites whatever the store last held.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use outreach_common::ChannelHandle;

use crate::store::StateStore;

pub const KEY_ENGAGE_PROGRESS: &str = "engage_progress";
pub const KEY_DISCOVERY_CURSOR: &str = "discovery_cursor";
pub const KEY_PROCESSED: &str = "processed_channels";
pub const KEY_FOUND: &str = "found_channels";

/// Engagement worker progress. Mutated only by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngageProgress {
    pub current_channel: Option<ChannelHandle>,
    pub processed_count: u64,
}

/// Discovery loop cursor over the `topics × keywords` cross-product.
/// Mutated only by the discovery loop. Empty between passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryCursor {
    pub topic: Option<String>,
    pub keyword: Option<String>,
}

impl DiscoveryCursor {
    pub fn at(topic: &str, keyword: &str) -> Self {
        Self {
            topic: Some(topic.to_string()),
            keyword: Some(keyword.to_string()),
        }
    }

    pub fn clear(&mut self) {
        self.topic = None;
        self.keyword = None;
    }

    pub fn is_empty(&self) -> bool {
        self.topic.is_none() && self.keyword.is_none()
    }
}

/// Persist a value, absorbing store failures.
pub async fn save_state<T: Serialize>(store: &dyn StateStore, key: &str, value: &T) {
    let json = match serde_json::to_value(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(key, error = %e, "State serialization failed, skipping persist");
            return;
        }
    };
    if let Err(e) = store.save(key, &json).await {
        warn!(key, error = %e, "State persist failed, in-memory state remains authoritative");
    }
}

/// Load a value, falling back to `T::default()` on any failure or absence.
pub async fn load_state<T: DeserializeOwned + Default>(store: &dyn StateStore, key: &str) -> T {
    match store.load(key).await {
        Ok(Some(json)) => match serde_json::from_value(json) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Persisted state is corrupt, starting fresh");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "State load failed, starting fresh");
            T::default()
        }
    }
}
