//! Two-tier form persistence.
//!
//! Reads try the session tier, then the durable tier, then fall back to the
//! built-in template. The automatic write path only touches the session tier.
//! Persistence is best-effort: failures are logged here and never reach the
//! orchestrator.

pub mod memory;
pub mod postgres_store;
pub mod redis_store;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::record::AggregateRecord;

/// Namespace of the key every snapshot is stored under.
pub const FORM_DATA_KEY: &str = "resume_form";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store of serialized records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short label used in logs ("session", "durable", ...).
    fn tier(&self) -> &'static str;

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

pub fn storage_key(owner: Uuid) -> String {
    format!("{FORM_DATA_KEY}:{owner}")
}

#[derive(Clone)]
pub struct FormPersistence {
    session: Arc<dyn RecordStore>,
    durable: Arc<dyn RecordStore>,
}

impl FormPersistence {
    pub fn new(session: Arc<dyn RecordStore>, durable: Arc<dyn RecordStore>) -> Self {
        Self { session, durable }
    }

    /// Session snapshot, else durable snapshot, else the template.
    /// A corrupt snapshot counts as absent.
    pub async fn load(&self, owner: Uuid) -> AggregateRecord {
        let key = storage_key(owner);
        for store in [&self.session, &self.durable] {
            if let Some(record) = read_tier(store.as_ref(), &key).await {
                info!("Loaded form for {owner} from {} store", store.tier());
                return record;
            }
        }
        info!("No stored form for {owner}; starting from template");
        AggregateRecord::template()
    }

    /// Write-through to the session tier. Never fails.
    pub async fn save(&self, owner: Uuid, record: &AggregateRecord) {
        if let Err(e) = write_tier(self.session.as_ref(), &storage_key(owner), record).await {
            warn!("Failed to persist form for {owner}: {e}");
        }
    }

    /// Explicit snapshot to the durable tier. Returns whether it was stored.
    pub async fn save_durable(&self, owner: Uuid, record: &AggregateRecord) -> bool {
        match write_tier(self.durable.as_ref(), &storage_key(owner), record).await {
            Ok(()) => {
                info!("Saved durable snapshot for {owner}");
                true
            }
            Err(e) => {
                warn!("Failed to save durable snapshot for {owner}: {e}");
                false
            }
        }
    }

    pub async fn clear_session(&self, owner: Uuid) {
        if let Err(e) = self.session.remove(&storage_key(owner)).await {
            warn!("Failed to clear session snapshot for {owner}: {e}");
        }
    }
}

async fn read_tier(store: &dyn RecordStore, key: &str) -> Option<AggregateRecord> {
    let raw = match store.read(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No {} snapshot under {key}", store.tier());
            return None;
        }
        Err(e) => {
            warn!("Reading {} store failed for {key}: {e}", store.tier());
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Ignoring corrupt {} snapshot under {key}: {e}", store.tier());
            None
        }
    }
}

async fn write_tier(
    store: &dyn RecordStore,
    key: &str,
    record: &AggregateRecord,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(record)
        .map_err(|e| StoreError::Unavailable(format!("serialization failed: {e}")))?;
    store.write(key, &raw).await
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryRecordStore;
    use super::*;
    use crate::form::validation::tests::complete_record;

    fn persistence() -> (FormPersistence, Arc<InMemoryRecordStore>, Arc<InMemoryRecordStore>) {
        let session = Arc::new(InMemoryRecordStore::new("session"));
        let durable = Arc::new(InMemoryRecordStore::new("durable"));
        (
            FormPersistence::new(session.clone(), durable.clone()),
            session,
            durable,
        )
    }

    #[tokio::test]
    async fn test_empty_stores_yield_template() {
        let (persistence, _, _) = persistence();
        let record = persistence.load(Uuid::new_v4()).await;
        assert_eq!(record.education.len(), 1);
        assert_eq!(record.experience.len(), 1);
        assert!(record.personal.full_name.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_in_fresh_instance() {
        let (persistence, session, durable) = persistence();
        let owner = Uuid::new_v4();
        let record = complete_record();
        persistence.save(owner, &record).await;

        let reloaded = FormPersistence::new(session, durable).load(owner).await;
        assert_eq!(reloaded, record);
    }

    #[tokio::test]
    async fn test_save_does_not_touch_durable_tier() {
        let (persistence, _, durable) = persistence();
        persistence.save(Uuid::new_v4(), &complete_record()).await;
        assert_eq!(durable.len().await, 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_durable_when_session_cleared() {
        let (persistence, session, _) = persistence();
        let owner = Uuid::new_v4();
        let snapshot = complete_record();
        assert!(persistence.save_durable(owner, &snapshot).await);

        let mut newer = snapshot.clone();
        newer.personal.full_name = "Ada King".to_string();
        persistence.save(owner, &newer).await;
        assert_eq!(persistence.load(owner).await, newer);

        session.clear().await;
        assert_eq!(persistence.load(owner).await, snapshot);
    }

    #[tokio::test]
    async fn test_corrupt_session_value_falls_through() {
        let (persistence, session, _) = persistence();
        let owner = Uuid::new_v4();
        let snapshot = complete_record();
        persistence.save_durable(owner, &snapshot).await;
        session.write(&storage_key(owner), "{not json").await.unwrap();

        assert_eq!(persistence.load(owner).await, snapshot);
    }

    #[tokio::test]
    async fn test_corrupt_everywhere_yields_template() {
        let (persistence, session, durable) = persistence();
        let owner = Uuid::new_v4();
        session.write(&storage_key(owner), "[]").await.unwrap();
        durable
            .write(&storage_key(owner), r#"{"personal": 3}"#)
            .await
            .unwrap();

        let record = persistence.load(owner).await;
        assert!(record.personal.full_name.is_empty());
        assert_eq!(record.education.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_is_swallowed() {
        let session = Arc::new(InMemoryRecordStore::new("session").with_failing_writes());
        let durable = Arc::new(InMemoryRecordStore::new("durable"));
        let persistence = FormPersistence::new(session.clone(), durable);

        persistence.save(Uuid::new_v4(), &complete_record()).await;
        assert_eq!(session.len().await, 0);
    }

    #[tokio::test]
    async fn test_clear_session_removes_snapshot() {
        let (persistence, session, _) = persistence();
        let owner = Uuid::new_v4();
        persistence.save(owner, &complete_record()).await;
        persistence.clear_session(owner).await;
        assert_eq!(session.len().await, 0);
    }
}
