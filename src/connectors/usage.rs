//! Monthly usage-hours estimator
//! 不访问外部服务，只根据库存中的状态估算

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::ConnectorRun;
use crate::models::usage::{estimated_hours, WorkspaceUsage};
use crate::repository::InventoryStore;

pub struct UsageEstimator {
    store: Arc<dyn InventoryStore>,
}

impl UsageEstimator {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// 估算当月用量
    pub async fn run(&self) -> ConnectorRun {
        let month = Utc::now().format("%Y-%m").to_string();
        self.run_for_month(&month).await
    }

    #[instrument(skip(self))]
    pub async fn run_for_month(&self, month: &str) -> ConnectorRun {
        let candidates = match self.store.usage_candidates().await {
            Ok(candidates) => candidates,
            Err(e) => return ConnectorRun::failed(0, e.into()),
        };

        let mut processed = 0i64;
        for (workspace_id, state) in candidates {
            let usage = WorkspaceUsage {
                usage_hours: estimated_hours(&state),
                workspace_id,
                month: month.to_string(),
            };

            match self.store.upsert_usage(&usage).await {
                Ok(()) => processed += 1,
                Err(e) => warn!(
                    workspace_id = %usage.workspace_id,
                    error = %e,
                    "Failed to upsert usage"
                ),
            }
        }

        info!(processed, "Usage hours calculated");
        ConnectorRun::completed(processed)
    }
}
