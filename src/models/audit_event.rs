//! CloudTrail audit event models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CloudTrail 中 WorkSpaces 资源的类型名
pub const WORKSPACE_RESOURCE_TYPE: &str = "AWS::WorkSpaces::Workspace";

/// 审计事件，以 event_id 去重，先写入者胜出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEvent {
    pub event_id: String,
    pub event_name: String,
    pub event_time: Option<DateTime<Utc>>,
    pub event_source: String,
    pub username: String,
    pub user_identity: serde_json::Value,
    /// 从资源列表中提取，没有时为空字符串
    pub workspace_id: String,
    pub request_parameters: serde_json::Value,
    pub event_region: String,
    pub raw_payload: Option<serde_json::Value>,
}
