use async_trait::async_trait;
use sqlx::PgPool;

use crate::persistence::{RecordStore, StoreError};

/// Durable tier, backed by the `form_snapshots` table (see `db::ensure_schema`).
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    fn tier(&self) -> &'static str {
        "durable"
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let data: Option<String> =
            sqlx::query_scalar("SELECT data FROM form_snapshots WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(data)
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO form_snapshots (key, data, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM form_snapshots WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
