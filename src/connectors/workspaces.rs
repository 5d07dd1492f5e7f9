//! WorkSpaces inventory connector

use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{non_empty, ConnectorRun};
use crate::error::MappingError;
use crate::models::{credentials::AwsCredentials, workspace::WorkspaceRecord};
use crate::providers::{CloudProvider, WorkspaceItem};
use crate::repository::InventoryStore;

impl TryFrom<WorkspaceItem> for WorkspaceRecord {
    type Error = MappingError;

    fn try_from(item: WorkspaceItem) -> Result<Self, Self::Error> {
        let workspace_id =
            non_empty(item.workspace_id).ok_or(MappingError::MissingField("workspace_id"))?;

        for (field, size) in [
            ("root_volume_size_gib", item.root_volume_size_gib),
            ("user_volume_size_gib", item.user_volume_size_gib),
        ] {
            if let Some(size) = size.filter(|s| *s < 0) {
                return Err(MappingError::InvalidValue {
                    field,
                    value: size.to_string(),
                });
            }
        }

        Ok(WorkspaceRecord {
            workspace_id,
            user_name: non_empty(item.user_name),
            directory_id: non_empty(item.directory_id),
            ip_address: non_empty(item.ip_address),
            state: non_empty(item.state),
            bundle_id: non_empty(item.bundle_id),
            subnet_id: non_empty(item.subnet_id),
            computer_name: non_empty(item.computer_name),
            running_mode: non_empty(item.running_mode),
            compute_type_name: non_empty(item.compute_type_name),
            root_volume_size_gib: item.root_volume_size_gib,
            user_volume_size_gib: item.user_volume_size_gib,
            // DescribeWorkspaces 不返回这些时间戳
            created_at: None,
            terminated_at: None,
            last_known_user_connection_at: None,
        })
    }
}

/// 库存连接器：页级错误中止整个拉取并返回已写入的数量
pub struct WorkspaceConnector {
    store: Arc<dyn InventoryStore>,
    provider: Arc<dyn CloudProvider>,
}

impl WorkspaceConnector {
    pub fn new(store: Arc<dyn InventoryStore>, provider: Arc<dyn CloudProvider>) -> Self {
        Self { store, provider }
    }

    #[instrument(skip(self, creds), fields(account = %creds.account_name))]
    pub async fn run(&self, creds: &AwsCredentials) -> ConnectorRun {
        let mut pages = match self.provider.workspaces(creds).await {
            Ok(pages) => pages,
            Err(e) => return e.into(),
        };

        let mut processed = 0i64;
        while let Some(page) = pages.next_page().await {
            let items = match page {
                Ok(items) => items,
                Err(e) => {
                    error!(error = %e, processed, "Failed to fetch WorkSpaces page");
                    return ConnectorRun::failed(processed, e);
                }
            };

            for item in items {
                let record = match WorkspaceRecord::try_from(item) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(error = %e, "Skipping unmappable workspace");
                        continue;
                    }
                };

                match self.store.upsert_workspace(&record, creds.account_id).await {
                    Ok(()) => processed += 1,
                    Err(e) => warn!(
                        workspace_id = %record.workspace_id,
                        error = %e,
                        "Failed to upsert workspace"
                    ),
                }
            }
        }

        info!(processed, "WorkSpaces inventory synced");
        ConnectorRun::completed(processed)
    }
}
