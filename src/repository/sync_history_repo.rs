//! Sync history repository

use async_trait::async_trait;
use sqlx::PgPool;

use super::SyncHistoryStore;
use crate::{
    error::Result,
    models::sync::{SyncHistory, SyncStatus},
};

pub struct SyncHistoryRepository {
    db: PgPool,
}

impl SyncHistoryRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncHistoryStore for SyncHistoryRepository {
    async fn create(&self, sync_type: &str, account_id: Option<i32>) -> Result<SyncHistory> {
        let history = sqlx::query_as::<_, SyncHistory>(
            r#"
            INSERT INTO sync_history (sync_type, account_id, status, records_processed, started_at)
            VALUES ($1, $2, 'running', 0, NOW())
            RETURNING *
            "#,
        )
        .bind(sync_type)
        .bind(account_id)
        .fetch_one(&self.db)
        .await?;

        Ok(history)
    }

    async fn complete(
        &self,
        id: i32,
        status: SyncStatus,
        records_processed: i64,
        error_message: Option<&str>,
    ) -> Result<()> {
        // 计数列为 INTEGER
        let records = i32::try_from(records_processed).unwrap_or(i32::MAX);

        sqlx::query(
            r#"
            UPDATE sync_history
            SET status = $2, records_processed = $3, error_message = $4, completed_at = NOW()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(records)
        .bind(error_message)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<SyncHistory>> {
        let history = sqlx::query_as::<_, SyncHistory>("SELECT * FROM sync_history WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(history)
    }

    async fn list(&self, limit: i64) -> Result<Vec<SyncHistory>> {
        let history = sqlx::query_as::<_, SyncHistory>(
            "SELECT * FROM sync_history ORDER BY started_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(history)
    }
}
