use async_trait::async_trait;
use redis::Client as RedisClient;

use crate::persistence::{RecordStore, StoreError};

/// Session tier. Snapshots expire after `ttl_secs` of inactivity.
#[derive(Clone)]
pub struct RedisRecordStore {
    client: RedisClient,
    ttl_secs: u64,
}

impl RedisRecordStore {
    pub fn new(client: RedisClient, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    fn tier(&self) -> &'static str {
        "session"
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut con)
            .await?;
        Ok(value)
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut con)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut con)
            .await?;
        Ok(())
    }
}
