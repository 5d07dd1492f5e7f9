//! Source account repository (账号数据访问)

use async_trait::async_trait;
use sqlx::PgPool;

use super::AccountStore;
use crate::{
    error::{AppError, Result},
    models::account::*,
};

pub struct AccountRepository {
    db: PgPool,
}

impl AccountRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// 唯一约束冲突转为 Conflict，其余保持数据库错误
fn map_unique_violation(e: sqlx::Error, what: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("{} already exists", what))
        }
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn list_active(&self, kind: AccountKind) -> Result<Vec<SourceAccount>> {
        let accounts = sqlx::query_as::<_, SourceAccount>(
            r#"
            SELECT * FROM source_accounts
            WHERE kind = $1 AND is_active = TRUE
            ORDER BY is_default DESC, name ASC
            "#,
        )
        .bind(kind)
        .fetch_all(&self.db)
        .await?;

        Ok(accounts)
    }

    async fn get(&self, id: i32) -> Result<Option<SourceAccount>> {
        let account = sqlx::query_as::<_, SourceAccount>(
            "SELECT * FROM source_accounts WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn get_default(&self, kind: AccountKind) -> Result<Option<SourceAccount>> {
        let account = sqlx::query_as::<_, SourceAccount>(
            r#"
            SELECT * FROM source_accounts
            WHERE kind = $1 AND is_default = TRUE AND is_active = TRUE
            LIMIT 1
            "#,
        )
        .bind(kind)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn create(&self, account: NewSourceAccount) -> Result<SourceAccount> {
        let mut tx = self.db.begin().await?;

        if account.is_default {
            sqlx::query(
                r#"
                UPDATE source_accounts SET is_default = FALSE, updated_at = NOW()
                WHERE kind = $1 AND is_default = TRUE
                "#,
            )
            .bind(account.kind)
            .execute(&mut *tx)
            .await?;
        }

        let created = sqlx::query_as::<_, SourceAccount>(
            r#"
            INSERT INTO source_accounts (
                kind, name, region_or_url, credentials, base_dn, search_filter,
                is_default, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING *
            "#,
        )
        .bind(account.kind)
        .bind(&account.name)
        .bind(&account.region_or_url)
        .bind(&account.credentials)
        .bind(&account.base_dn)
        .bind(&account.search_filter)
        .bind(account.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "account"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, id: i32, changes: SourceAccountChanges) -> Result<SourceAccount> {
        let mut tx = self.db.begin().await?;

        let kind = sqlx::query_scalar::<_, AccountKind>(
            "SELECT kind FROM source_accounts WHERE id = $1 AND is_active = TRUE FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("account"))?;

        if changes.is_default == Some(true) {
            sqlx::query(
                r#"
                UPDATE source_accounts SET is_default = FALSE, updated_at = NOW()
                WHERE kind = $1 AND is_default = TRUE AND id <> $2
                "#,
            )
            .bind(kind)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<_, SourceAccount>(
            r#"
            UPDATE source_accounts
            SET
                name = COALESCE(NULLIF($2, ''), name),
                region_or_url = COALESCE(NULLIF($3, ''), region_or_url),
                credentials = COALESCE(NULLIF($4, ''), credentials),
                base_dn = COALESCE(NULLIF($5, ''), base_dn),
                search_filter = COALESCE(NULLIF($6, ''), search_filter),
                is_default = COALESCE($7, is_default),
                updated_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.region_or_url)
        .bind(&changes.credentials)
        .bind(&changes.base_dn)
        .bind(&changes.search_filter)
        .bind(changes.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "account"))?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn deactivate(&self, id: i32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE source_accounts
            SET is_active = FALSE, is_default = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("account"));
        }
        Ok(())
    }

    async fn update_status(&self, id: i32, status: AccountStatus) -> Result<()> {
        sqlx::query("UPDATE source_accounts SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn record_sync(&self, id: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE source_accounts
            SET status = 'connected', last_sync_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn set_external_account_id(&self, id: i32, external_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE source_accounts SET external_account_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(external_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
