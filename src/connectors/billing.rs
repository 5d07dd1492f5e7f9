//! Cost Explorer billing connector

use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::ConnectorRun;
use crate::error::MappingError;
use crate::models::{
    billing::{CostRecord, WORKSPACES_SERVICE},
    credentials::AwsCredentials,
};
use crate::providers::{CloudProvider, CostBucket, CostQuery};
use crate::repository::InventoryStore;

const USAGE_TYPE_DIMENSION: &str = "USAGE_TYPE";
const DEFAULT_UNIT: &str = "USD";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, MappingError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| MappingError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

/// 一个时间桶展开为多条账单记录；时间段格式错误时整个桶无效
pub(crate) fn bucket_records(bucket: CostBucket) -> Result<Vec<CostRecord>, MappingError> {
    let start_date = parse_date("start_date", &bucket.start)?;
    let end_date = parse_date("end_date", &bucket.end)?;

    Ok(bucket
        .groups
        .into_iter()
        .map(|group| {
            let usage_type = group.keys.into_iter().next().unwrap_or_default();
            // 金额解析失败记为 0
            let amount = group
                .amount
                .as_deref()
                .and_then(|a| a.trim().parse::<f64>().ok())
                .filter(|a| a.is_finite())
                .unwrap_or(0.0);
            let unit = group
                .unit
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_UNIT.to_string());

            CostRecord {
                // Cost Explorer 不提供 WorkSpace 维度
                workspace_id: String::new(),
                service: WORKSPACES_SERVICE.to_string(),
                usage_type,
                start_date,
                end_date,
                amount,
                unit,
            }
        })
        .collect())
}

pub struct CostConnector {
    store: Arc<dyn InventoryStore>,
    provider: Arc<dyn CloudProvider>,
    lookback: Duration,
}

impl CostConnector {
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
        let end = Utc::now().date_naive();
        let query = CostQuery {
            start: end - self.lookback,
            end,
            service: WORKSPACES_SERVICE.to_string(),
            group_by: USAGE_TYPE_DIMENSION.to_string(),
        };

        let mut pages = match self.provider.cost_and_usage(creds, query).await {
            Ok(pages) => pages,
            Err(e) => return e.into(),
        };

        let mut processed = 0i64;
        while let Some(page) = pages.next_page().await {
            let buckets = match page {
                Ok(buckets) => buckets,
                Err(e) => {
                    error!(error = %e, processed, "Failed to get cost and usage");
                    return ConnectorRun::failed(processed, e);
                }
            };

            for bucket in buckets {
                let records = match bucket_records(bucket) {
                    Ok(records) => records,
                    Err(e) => {
                        warn!(error = %e, "Skipping cost bucket with malformed period");
                        continue;
                    }
                };

                for record in records {
                    match self.store.upsert_cost_record(&record, creds.account_id).await {
                        Ok(()) => processed += 1,
                        Err(e) => warn!(
                            usage_type = %record.usage_type,
                            error = %e,
                            "Failed to upsert billing data"
                        ),
                    }
                }
            }
        }

        info!(processed, "Billing data synced");
        ConnectorRun::completed(processed)
    }
}
