//! Database repository layer
//!
//! 同步服务只依赖这里定义的存储 trait，PostgreSQL 实现位于各子模块。
//! 所有写操作以自然键做 insert-or-update，可安全重试，也可在不同同步之间并发执行。

pub mod account_repo;
pub mod inventory_repo;
pub mod notification_repo;
pub mod settings_repo;
pub mod sync_history_repo;

pub use account_repo::AccountRepository;
pub use inventory_repo::InventoryRepository;
pub use notification_repo::NotificationRepository;
pub use settings_repo::SettingsRepository;
pub use sync_history_repo::SyncHistoryRepository;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    account::{AccountKind, AccountStatus, NewSourceAccount, SourceAccount, SourceAccountChanges},
    audit_event::AuditEvent,
    billing::CostRecord,
    sync::{SyncHistory, SyncStatus},
    usage::WorkspaceUsage,
    workspace::{DirectoryAttributes, WorkspaceRecord},
};

/// Source Account 存储
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// 指定类型的全部活跃账号（默认账号在前）
    async fn list_active(&self, kind: AccountKind) -> Result<Vec<SourceAccount>>;

    /// 按 ID 查找活跃账号
    async fn get(&self, id: i32) -> Result<Option<SourceAccount>>;

    /// 查找 is_default 且 is_active 的账号
    async fn get_default(&self, kind: AccountKind) -> Result<Option<SourceAccount>>;

    /// 创建账号；设为默认时在同一事务中清除同类型的旧默认账号
    async fn create(&self, account: NewSourceAccount) -> Result<SourceAccount>;

    async fn update(&self, id: i32, changes: SourceAccountChanges) -> Result<SourceAccount>;

    /// 软删除
    async fn deactivate(&self, id: i32) -> Result<()>;

    async fn update_status(&self, id: i32, status: AccountStatus) -> Result<()>;

    /// 同步成功：status = connected 且 last_sync_at = now
    async fn record_sync(&self, id: i32) -> Result<()>;

    async fn set_external_account_id(&self, id: i32, external_id: &str) -> Result<()>;
}

/// 库存/审计/账单/用量的写入层
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// 以 workspace_id 为键 insert-or-update，从不删除
    async fn upsert_workspace(
        &self,
        workspace: &WorkspaceRecord,
        owning_account_id: Option<i32>,
    ) -> Result<()>;

    /// 以 event_id 去重，冲突时忽略；返回是否新插入
    async fn insert_audit_event(
        &self,
        event: &AuditEvent,
        owning_account_id: Option<i32>,
    ) -> Result<bool>;

    /// 以复合键 insert-or-update，amount/unit 后写覆盖
    async fn upsert_cost_record(
        &self,
        record: &CostRecord,
        owning_account_id: Option<i32>,
    ) -> Result<()>;

    async fn upsert_usage(&self, usage: &WorkspaceUsage) -> Result<()>;

    /// 参与用量估算的 (workspace_id, state)
    async fn usage_candidates(&self) -> Result<Vec<(String, String)>>;

    /// 库存中已知的非空用户名（去重）
    async fn distinct_user_names(&self) -> Result<Vec<String>>;

    /// 将目录属性写到所有同名用户的 WorkSpace 上，返回影响行数
    async fn apply_directory_attributes(
        &self,
        user_name: &str,
        attributes: &DirectoryAttributes,
    ) -> Result<u64>;
}

/// 同步历史存储
#[async_trait]
pub trait SyncHistoryStore: Send + Sync {
    /// 创建 running 状态的记录
    async fn create(&self, sync_type: &str, account_id: Option<i32>) -> Result<SyncHistory>;

    /// 写入终态
    async fn complete(
        &self,
        id: i32,
        status: SyncStatus,
        records_processed: i64,
        error_message: Option<&str>,
    ) -> Result<()>;

    async fn get(&self, id: i32) -> Result<Option<SyncHistory>>;

    /// 最近的记录在前
    async fn list(&self, limit: i64) -> Result<Vec<SyncHistory>>;
}

/// 扁平 key-value 设置存储，加密值在读取时透明解密
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str, encrypted: bool) -> Result<()>;
}
