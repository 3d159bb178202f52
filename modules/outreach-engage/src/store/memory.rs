use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::StateStore;

/// In-memory store for tests and single-run deployments. Durable only for
/// the lifetime of the process, but shares the `StateStore` contract so a
/// restarted pipeline instance can reload from the same store handle.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }
}
