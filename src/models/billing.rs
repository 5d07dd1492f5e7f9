//! Cost Explorer billing models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 账单查询的服务维度
pub const WORKSPACES_SERVICE: &str = "Amazon WorkSpaces";

/// 账单记录，复合键为 (workspace_id, service, usage_type, start_date, end_date)
///
/// Cost Explorer 的 usage type 不带 WorkSpace ID，`workspace_id` 通常为空字符串。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CostRecord {
    pub workspace_id: String,
    pub service: String,
    pub usage_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub amount: f64,
    pub unit: String,
}
