//! Notification repository

use sqlx::PgPool;

use crate::{error::Result, models::notification::NewNotification};

pub struct NotificationRepository {
    db: PgPool,
}

impl NotificationRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 插入通知，返回新行 ID
    pub async fn insert(&self, notification: &NewNotification) -> Result<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO notifications (event_type, title, message, severity, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(notification.event_type.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.severity.as_str())
        .bind(&notification.metadata)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }
}
