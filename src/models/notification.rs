//! Notification models

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    SyncCompleted,
    SyncFailed,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::SyncCompleted => "sync_completed",
            NotificationEvent::SyncFailed => "sync_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }
}

/// 待写入的通知
#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub event_type: NotificationEvent,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub metadata: serde_json::Value,
}

impl NewNotification {
    pub fn sync_completed(label: &str, records_processed: i64) -> Self {
        Self {
            event_type: NotificationEvent::SyncCompleted,
            title: "Sync Completed".to_string(),
            message: format!(
                "Sync of type '{}' completed successfully. Processed {} records.",
                label, records_processed
            ),
            severity: Severity::Success,
            metadata: serde_json::json!({
                "sync_type": label,
                "records_processed": records_processed,
            }),
        }
    }

    pub fn sync_failed(label: &str, error_message: &str) -> Self {
        Self {
            event_type: NotificationEvent::SyncFailed,
            title: "Sync Failed".to_string(),
            message: format!("Sync of type '{}' failed: {}", label, error_message),
            severity: Severity::Error,
            metadata: serde_json::json!({
                "sync_type": label,
                "error": error_message,
            }),
        }
    }
}
