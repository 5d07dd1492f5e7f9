//! WorkSpace inventory models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WorkSpaces 库存记录，以 workspace_id 为自然键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkspaceRecord {
    pub workspace_id: String,
    pub user_name: Option<String>,
    pub directory_id: Option<String>,
    pub ip_address: Option<String>,
    pub state: Option<String>,
    pub bundle_id: Option<String>,
    pub subnet_id: Option<String>,
    pub computer_name: Option<String>,
    pub running_mode: Option<String>,
    pub compute_type_name: Option<String>,
    pub root_volume_size_gib: Option<i32>,
    pub user_volume_size_gib: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub last_known_user_connection_at: Option<DateTime<Utc>>,
}

/// 从目录服务合并到 WorkSpace 上的用户属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryAttributes {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub manager: Option<String>,
}

/// 库存中一条带所属账号的 WorkSpace（查询视图）
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredWorkspace {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: WorkspaceRecord,
    pub owning_account_id: Option<i32>,
    pub ad_full_name: Option<String>,
    pub ad_email: Option<String>,
    pub ad_department: Option<String>,
    pub ad_job_title: Option<String>,
    pub ad_manager: Option<String>,
    pub ad_last_sync: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
