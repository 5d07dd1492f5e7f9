//! Source connectors
//!
//! 每个连接器负责一类外部数据：拉取、映射、写入。
//! 单条记录的失败只记日志并跳过；页级错误的处理策略因连接器而异：
//! 库存与账单中止并上报，审计只保留已拉取的部分。

pub mod billing;
pub mod cloudtrail;
pub mod directory;
pub mod usage;
pub mod workspaces;

pub use billing::CostConnector;
pub use cloudtrail::AuditConnector;
pub use directory::DirectoryConnector;
pub use usage::UsageEstimator;
pub use workspaces::WorkspaceConnector;

use crate::error::SyncError;

/// 一次连接器运行的结果：成功写入的条数，以及第一个硬错误
#[derive(Debug, Default)]
pub struct ConnectorRun {
    pub processed: i64,
    pub error: Option<SyncError>,
}

impl ConnectorRun {
    pub fn completed(processed: i64) -> Self {
        Self {
            processed,
            error: None,
        }
    }

    pub fn failed(processed: i64, error: SyncError) -> Self {
        Self {
            processed,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// 累加另一次运行：计数总是相加，错误以后到者为准
    pub fn merge(&mut self, other: ConnectorRun) {
        self.processed += other.processed;
        if let Some(error) = other.error {
            self.error = Some(error);
        }
    }
}

impl From<SyncError> for ConnectorRun {
    fn from(error: SyncError) -> Self {
        Self::failed(0, error)
    }
}

/// 空字符串视为缺失
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
