//! Notification sink
//! 通知失败只记录日志，永远不会影响同步结果

use async_trait::async_trait;
use tracing::{error, info};

use crate::models::notification::NewNotification;
use crate::repository::NotificationRepository;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_sync_completed(&self, label: &str, records_processed: i64);

    async fn notify_sync_failed(&self, label: &str, error_message: &str);
}

/// 写入 notifications 表
pub struct NotificationService {
    repo: NotificationRepository,
}

impl NotificationService {
    pub fn new(repo: NotificationRepository) -> Self {
        Self { repo }
    }

    async fn publish(&self, notification: NewNotification) {
        match self.repo.insert(&notification).await {
            Ok(id) => info!(
                notification_id = id,
                event_type = notification.event_type.as_str(),
                "Notification created"
            ),
            Err(e) => error!(
                event_type = notification.event_type.as_str(),
                error = %e,
                "Failed to create notification"
            ),
        }
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn notify_sync_completed(&self, label: &str, records_processed: i64) {
        self.publish(NewNotification::sync_completed(label, records_processed))
            .await;
    }

    async fn notify_sync_failed(&self, label: &str, error_message: &str) {
        self.publish(NewNotification::sync_failed(label, error_message))
            .await;
    }
}
