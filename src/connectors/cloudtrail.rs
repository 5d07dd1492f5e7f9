//! CloudTrail audit event connector
//!
//! 页级错误只中断循环，返回已处理的数量且不报错。

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{non_empty, ConnectorRun};
use crate::error::MappingError;
use crate::models::{
    audit_event::{AuditEvent, WORKSPACE_RESOURCE_TYPE},
    credentials::AwsCredentials,
};
use crate::providers::{AuditEventItem, AuditWindow, CloudProvider};
use crate::repository::InventoryStore;

/// 第一个 WorkSpace 类型资源的名称，没有则为空字符串
fn workspace_id_of(item: &AuditEventItem) -> String {
    item.resources
        .iter()
        .find(|r| r.resource_type.as_deref() == Some(WORKSPACE_RESOURCE_TYPE))
        .and_then(|r| r.resource_name.clone())
        .unwrap_or_default()
}

/// 从原始事件中取出 requestParameters，缺失或无法解析时为 `{}`
fn request_parameters_of(raw: Option<&Value>) -> Value {
    raw.and_then(|event| event.get("requestParameters"))
        .filter(|params| !params.is_null())
        .cloned()
        .unwrap_or_else(|| json!({}))
}

pub(crate) fn map_event(item: AuditEventItem, region: &str) -> Result<AuditEvent, MappingError> {
    let workspace_id = workspace_id_of(&item);
    let raw_payload = item
        .cloud_trail_event
        .as_deref()
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
    let request_parameters = request_parameters_of(raw_payload.as_ref());

    let event_id = non_empty(item.event_id).ok_or(MappingError::MissingField("event_id"))?;
    let username = item.username.unwrap_or_default();

    Ok(AuditEvent {
        event_id,
        event_name: item.event_name.unwrap_or_default(),
        event_time: item.event_time,
        event_source: item.event_source.unwrap_or_default(),
        user_identity: json!({ "username": username }),
        username,
        workspace_id,
        request_parameters,
        event_region: region.to_string(),
        raw_payload,
    })
}

pub struct AuditConnector {
    store: Arc<dyn InventoryStore>,
    provider: Arc<dyn CloudProvider>,
    lookback: Duration,
}

impl AuditConnector {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        provider: Arc<dyn CloudProvider>,
        lookback_days: i64,
    ) -> Self {
        Self {
            store,
            provider,
            lookback: Duration::days(lookback_days),
        }
    }

    #[instrument(skip(self, creds), fields(account = %creds.account_name))]
    pub async fn run(&self, creds: &AwsCredentials) -> ConnectorRun {
        let end = Utc::now();
        let window = AuditWindow {
            start: end - self.lookback,
            end,
            resource_type: WORKSPACE_RESOURCE_TYPE.to_string(),
        };

        let mut pages = match self.provider.audit_events(creds, window).await {
            Ok(pages) => pages,
            Err(e) => return e.into(),
        };

        let mut processed = 0i64;
        let mut inserted = 0i64;
        while let Some(page) = pages.next_page().await {
            let items = match page {
                Ok(items) => items,
                Err(e) => {
                    warn!(error = %e, processed, "Error fetching CloudTrail events, keeping partial result");
                    break;
                }
            };

            for item in items {
                let event = match map_event(item, &creds.region) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Skipping unmappable CloudTrail event");
                        continue;
                    }
                };

                match self.store.insert_audit_event(&event, creds.account_id).await {
                    Ok(is_new) => {
                        processed += 1;
                        inserted += i64::from(is_new);
                    }
                    Err(e) => warn!(
                        event_id = %event.event_id,
                        error = %e,
                        "Failed to store CloudTrail event"
                    ),
                }
            }
        }

        info!(processed, inserted, "CloudTrail events synced");
        ConnectorRun::completed(processed)
    }
}
