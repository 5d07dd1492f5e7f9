//! Inventory repository (库存/审计/账单/用量写入)

use async_trait::async_trait;
use sqlx::PgPool;

use super::InventoryStore;
use crate::{
    error::Result,
    models::{
        audit_event::AuditEvent,
        billing::CostRecord,
        usage::{WorkspaceUsage, USAGE_STATES},
        workspace::{DirectoryAttributes, StoredWorkspace, WorkspaceRecord},
    },
};

pub struct InventoryRepository {
    db: PgPool,
}

impl InventoryRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 按 workspace_id 查询（测试与排查用）
    pub async fn get_workspace(&self, workspace_id: &str) -> Result<Option<StoredWorkspace>> {
        let workspace = sqlx::query_as::<_, StoredWorkspace>(
            "SELECT * FROM workspaces WHERE workspace_id = $1",
        )
        .bind(workspace_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(workspace)
    }
}

#[async_trait]
impl InventoryStore for InventoryRepository {
    async fn upsert_workspace(
        &self,
        ws: &WorkspaceRecord,
        owning_account_id: Option<i32>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workspaces (
                workspace_id, user_name, directory_id, ip_address, state, bundle_id,
                subnet_id, computer_name, running_mode, compute_type_name,
                root_volume_size_gib, user_volume_size_gib, created_at, terminated_at,
                last_known_user_connection_at, owning_account_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, NOW())
            ON CONFLICT (workspace_id) DO UPDATE SET
                user_name = EXCLUDED.user_name,
                directory_id = EXCLUDED.directory_id,
                ip_address = EXCLUDED.ip_address,
                state = EXCLUDED.state,
                bundle_id = EXCLUDED.bundle_id,
                subnet_id = EXCLUDED.subnet_id,
                computer_name = EXCLUDED.computer_name,
                running_mode = EXCLUDED.running_mode,
                compute_type_name = EXCLUDED.compute_type_name,
                root_volume_size_gib = EXCLUDED.root_volume_size_gib,
                user_volume_size_gib = EXCLUDED.user_volume_size_gib,
                created_at = COALESCE(EXCLUDED.created_at, workspaces.created_at),
                terminated_at = EXCLUDED.terminated_at,
                last_known_user_connection_at = EXCLUDED.last_known_user_connection_at,
                owning_account_id = COALESCE(EXCLUDED.owning_account_id, workspaces.owning_account_id),
                updated_at = NOW()
            "#,
        )
        .bind(&ws.workspace_id)
        .bind(&ws.user_name)
        .bind(&ws.directory_id)
        .bind(&ws.ip_address)
        .bind(&ws.state)
        .bind(&ws.bundle_id)
        .bind(&ws.subnet_id)
        .bind(&ws.computer_name)
        .bind(&ws.running_mode)
        .bind(&ws.compute_type_name)
        .bind(ws.root_volume_size_gib)
        .bind(ws.user_volume_size_gib)
        .bind(ws.created_at)
        .bind(ws.terminated_at)
        .bind(ws.last_known_user_connection_at)
        .bind(owning_account_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn insert_audit_event(
        &self,
        event: &AuditEvent,
        owning_account_id: Option<i32>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO cloudtrail_events (
                event_id, event_name, event_time, event_source, username, user_identity,
                workspace_id, request_parameters, event_region, raw_payload, owning_account_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.event_name)
        .bind(event.event_time)
        .bind(&event.event_source)
        .bind(&event.username)
        .bind(&event.user_identity)
        .bind(&event.workspace_id)
        .bind(&event.request_parameters)
        .bind(&event.event_region)
        .bind(&event.raw_payload)
        .bind(owning_account_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn upsert_cost_record(
        &self,
        record: &CostRecord,
        owning_account_id: Option<i32>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO billing_data (
                workspace_id, service, usage_type, start_date, end_date, amount, unit,
                owning_account_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (workspace_id, service, usage_type, start_date, end_date) DO UPDATE SET
                amount = EXCLUDED.amount,
                unit = EXCLUDED.unit,
                owning_account_id = COALESCE(EXCLUDED.owning_account_id, billing_data.owning_account_id),
                updated_at = NOW()
            "#,
        )
        .bind(&record.workspace_id)
        .bind(&record.service)
        .bind(&record.usage_type)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.amount)
        .bind(&record.unit)
        .bind(owning_account_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn upsert_usage(&self, usage: &WorkspaceUsage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO workspace_usage (workspace_id, month, usage_hours, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (workspace_id, month) DO UPDATE SET
                usage_hours = EXCLUDED.usage_hours,
                updated_at = NOW()
            "#,
        )
        .bind(&usage.workspace_id)
        .bind(&usage.month)
        .bind(usage.usage_hours)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn usage_candidates(&self) -> Result<Vec<(String, String)>> {
        let states: Vec<String> = USAGE_STATES.iter().map(|s| s.to_string()).collect();
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT workspace_id, state FROM workspaces
            WHERE state = ANY($1)
            ORDER BY workspace_id
            "#,
        )
        .bind(&states)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn distinct_user_names(&self) -> Result<Vec<String>> {
        let users = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT user_name FROM workspaces
            WHERE user_name IS NOT NULL AND user_name <> ''
            ORDER BY user_name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    async fn apply_directory_attributes(
        &self,
        user_name: &str,
        attributes: &DirectoryAttributes,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET
                ad_full_name = $2,
                ad_email = $3,
                ad_department = $4,
                ad_job_title = $5,
                ad_manager = $6,
                ad_last_sync = NOW(),
                updated_at = NOW()
            WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .bind(&attributes.full_name)
        .bind(&attributes.email)
        .bind(&attributes.department)
        .bind(&attributes.job_title)
        .bind(&attributes.manager)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
