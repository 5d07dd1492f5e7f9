//! Monthly usage estimation models

use serde::{Deserialize, Serialize};

/// 参与用量估算的 WorkSpace 状态
pub const USAGE_STATES: [&str; 3] = ["AVAILABLE", "STOPPED", "IMPAIRED"];

/// 单个 WorkSpace 的月度用量，以 (workspace_id, month) 为键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkspaceUsage {
    pub workspace_id: String,
    /// 格式 YYYY-MM
    pub month: String,
    pub usage_hours: f64,
}

/// 按状态估算的月度用量小时数
pub fn estimated_hours(state: &str) -> f64 {
    match state {
        // 全天运行
        "AVAILABLE" => 720.0,
        "STOPPED" => 0.0,
        // 约每周 40 小时
        _ => 160.0,
    }
}
