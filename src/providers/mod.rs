//! External provider seams
//!
//! 连接器只依赖这里的 trait；AWS SDK 与 ldap3 的实现分别位于 `aws` 与 `ldap`。
//! 分页接口以 `PageStream` 的形式暴露：每次 `next_page` 返回一页，`None` 表示结束。

pub mod aws;
pub mod ldap;

pub use aws::AwsProvider;
pub use ldap::LdapDirectory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::error::SyncError;
use crate::models::credentials::{AwsCredentials, DirectoryCredentials};

/// 服务端分页的惰性序列
#[async_trait]
pub trait PageStream<T>: Send {
    /// 下一页；出错后调用方不应继续拉取
    async fn next_page(&mut self) -> Option<Result<Vec<T>, SyncError>>;
}

/// DescribeWorkspaces 返回的单个 WorkSpace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceItem {
    pub workspace_id: Option<String>,
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
}

/// 事件关联的资源 (resource_type, resource_name)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResource {
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
}

/// LookupEvents 返回的单个事件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditEventItem {
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
    pub event_source: Option<String>,
    pub username: Option<String>,
    pub resources: Vec<EventResource>,
    /// 原始事件 JSON 字符串
    pub cloud_trail_event: Option<String>,
}

/// 审计查询窗口
#[derive(Debug, Clone, PartialEq)]
pub struct AuditWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub resource_type: String,
}

/// 账单查询条件（按天，按 usage type 分组）
#[derive(Debug, Clone, PartialEq)]
pub struct CostQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub service: String,
    pub group_by: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostGroup {
    pub keys: Vec<String>,
    pub amount: Option<String>,
    pub unit: Option<String>,
}

/// 一个时间桶及其分组
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostBucket {
    pub start: String,
    pub end: String,
    pub groups: Vec<CostGroup>,
}

/// 连接测试结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProbe {
    /// STS 返回的账号 ID
    pub external_account_id: String,
    /// 能否列出 WorkSpaces
    pub workspaces_access: bool,
}

/// 云厂商 API
#[async_trait]
pub trait CloudProvider: Send + Sync {
    async fn workspaces(
        &self,
        creds: &AwsCredentials,
    ) -> Result<Box<dyn PageStream<WorkspaceItem>>, SyncError>;

    async fn audit_events(
        &self,
        creds: &AwsCredentials,
        window: AuditWindow,
    ) -> Result<Box<dyn PageStream<AuditEventItem>>, SyncError>;

    async fn cost_and_usage(
        &self,
        creds: &AwsCredentials,
        query: CostQuery,
    ) -> Result<Box<dyn PageStream<CostBucket>>, SyncError>;

    /// 身份校验失败返回错误；仅缺少 WorkSpaces 权限时 `workspaces_access = false`
    async fn probe(&self, creds: &AwsCredentials) -> Result<ConnectionProbe, SyncError>;
}

/// 目录条目的属性
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// 属性的第一个非空值
    pub fn first(&self, attr: &str) -> Option<String> {
        self.attrs
            .get(attr)
            .and_then(|values| values.iter().find(|v| !v.is_empty()))
            .cloned()
    }
}

/// 目录服务
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// 建立连接并 bind；bind 失败返回 `SyncError::Authentication`
    async fn connect(
        &self,
        creds: &DirectoryCredentials,
    ) -> Result<Box<dyn DirectorySession>, SyncError>;
}

/// 已 bind 的目录会话
#[async_trait]
pub trait DirectorySession: Send {
    /// 子树搜索，返回第一个匹配条目
    async fn find_user(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Option<DirectoryEntry>, SyncError>;

    async fn close(&mut self);
}
