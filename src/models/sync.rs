//! Sync history and sync request models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::account::AccountKind;

/// 同步类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// WorkSpaces 库存
    Workspaces,
    /// CloudTrail 审计事件
    Cloudtrail,
    /// Cost Explorer 账单
    Billing,
    /// 月度用量估算
    Usage,
    /// AD/LDAP 用户属性
    ActiveDirectory,
    /// 依次执行以上全部
    All,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Workspaces => "workspaces",
            SyncType::Cloudtrail => "cloudtrail",
            SyncType::Billing => "billing",
            SyncType::Usage => "usage",
            SyncType::ActiveDirectory => "active_directory",
            SyncType::All => "all",
        }
    }

    /// AWS 账号上依次执行的连接器；组合同步随后执行 usage 与目录同步
    pub const AWS_CONNECTORS: [SyncType; 3] =
        [SyncType::Workspaces, SyncType::Cloudtrail, SyncType::Billing];

    /// 该同步类型需要的账号类型（usage 与 all 不绑定单一类型）
    pub fn account_kind(&self) -> Option<AccountKind> {
        match self {
            SyncType::Workspaces | SyncType::Cloudtrail | SyncType::Billing => {
                Some(AccountKind::Aws)
            }
            SyncType::ActiveDirectory => Some(AccountKind::Ldap),
            SyncType::Usage | SyncType::All => None,
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workspaces" => Ok(SyncType::Workspaces),
            "cloudtrail" => Ok(SyncType::Cloudtrail),
            "billing" => Ok(SyncType::Billing),
            "usage" => Ok(SyncType::Usage),
            "active_directory" | "ad" => Ok(SyncType::ActiveDirectory),
            "all" => Ok(SyncType::All),
            other => Err(format!("unknown sync type: {}", other)),
        }
    }
}

/// 同步目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    /// 默认账号，没有则使用旧版设置
    Default,
    /// 指定账号
    Account(i32),
    /// 所有活跃账号
    AllAccounts,
}

impl SyncTarget {
    pub fn account_id(&self) -> Option<i32> {
        match self {
            SyncTarget::Account(id) => Some(*id),
            _ => None,
        }
    }
}

impl FromStr for SyncTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "default" => Ok(SyncTarget::Default),
            "all" => Ok(SyncTarget::AllAccounts),
            id => id
                .parse::<i32>()
                .ok()
                .filter(|id| *id > 0)
                .map(SyncTarget::Account)
                .ok_or_else(|| format!("invalid account: {}", id)),
        }
    }
}

/// 一次同步请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    pub sync_type: SyncType,
    pub target: SyncTarget,
}

impl SyncRequest {
    pub fn new(sync_type: SyncType, target: SyncTarget) -> Self {
        Self { sync_type, target }
    }
}

/// 同步状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "sync_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Running => write!(f, "running"),
            SyncStatus::Completed => write!(f, "completed"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 同步历史：创建时为 running，结束时更新一次为终态
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SyncHistory {
    pub id: i32,
    pub sync_type: String,
    pub account_id: Option<i32>,
    pub status: SyncStatus,
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 同步终态结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub sync_id: i32,
    pub status: SyncStatus,
    pub records_processed: i64,
    pub error_message: Option<String>,
}

/// 同步触发请求的查询参数
#[derive(Debug, Deserialize)]
pub struct TriggerSyncQuery {
    #[serde(rename = "type")]
    pub sync_type: Option<String>,
    pub account: Option<String>,
}

/// 同步历史查询参数
#[derive(Debug, Deserialize)]
pub struct SyncHistoryQuery {
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_type() {
        assert_eq!("workspaces".parse::<SyncType>(), Ok(SyncType::Workspaces));
        assert_eq!("ad".parse::<SyncType>(), Ok(SyncType::ActiveDirectory));
        assert_eq!(
            "active_directory".parse::<SyncType>(),
            Ok(SyncType::ActiveDirectory)
        );
        assert!("everything".parse::<SyncType>().is_err());
    }

    #[test]
    fn test_parse_sync_target() {
        assert_eq!("".parse::<SyncTarget>(), Ok(SyncTarget::Default));
        assert_eq!("all".parse::<SyncTarget>(), Ok(SyncTarget::AllAccounts));
        assert_eq!("7".parse::<SyncTarget>(), Ok(SyncTarget::Account(7)));
        assert!("0".parse::<SyncTarget>().is_err());
        assert!("abc".parse::<SyncTarget>().is_err());
    }

    #[test]
    fn test_aws_connectors_are_aws_kind() {
        assert_eq!(SyncType::AWS_CONNECTORS[0], SyncType::Workspaces);
        assert!(SyncType::AWS_CONNECTORS
            .iter()
            .all(|t| t.account_kind() == Some(AccountKind::Aws)));
    }
}
