use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::persistence::{RecordStore, StoreError};

/// Process-local store. Used when Redis or Postgres is not configured, and in tests.
#[derive(Debug, Clone)]
pub struct InMemoryRecordStore {
    tier: &'static str,
    values: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: bool,
}

impl InMemoryRecordStore {
    pub fn new(tier: &'static str) -> Self {
        Self {
            tier,
            values: Arc::new(RwLock::new(HashMap::new())),
            fail_writes: false,
        }
    }

    /// Every write fails, as an unreachable or full store would.
    #[cfg(test)]
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    #[cfg(test)]
    pub async fn clear(&self) {
        self.values.write().await.clear();
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn tier(&self) -> &'static str {
        self.tier
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable(format!("{} store quota exceeded", self.tier)));
        }
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
