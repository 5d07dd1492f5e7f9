//! Sync orchestrator
//!
//! 每次同步：先写入 running 状态的历史记录，再在整体超时内执行连接器，
//! 最后发送一次通知并写入终态。组合同步 (`all`) 按固定顺序串行执行，
//! 计数总是累加，错误以最后一个失败的连接器为准。

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::credential_service::{AccountRef, CredentialResolver};
use super::notification_service::NotificationSink;
use crate::config::SyncConfig;
use crate::connectors::{
    AuditConnector, ConnectorRun, CostConnector, DirectoryConnector, UsageEstimator,
    WorkspaceConnector,
};
use crate::crypto::SecretCipher;
use crate::error::{Result, SyncError};
use crate::models::{
    account::{AccountKind, AccountStatus, SourceAccount},
    credentials::AwsCredentials,
    sync::{SyncHistory, SyncOutcome, SyncRequest, SyncStatus, SyncTarget, SyncType},
};
use crate::providers::{CloudProvider, DirectoryProvider};
use crate::repository::{AccountStore, InventoryStore, SettingsStore, SyncHistoryStore};

/// 当前正在同步的账号；整体超时取消后据此把该账号标记为 error
#[derive(Default)]
struct InFlight(Mutex<Option<i32>>);

impl InFlight {
    fn enter(&self, id: i32) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = Some(id);
    }

    fn leave(&self) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    fn current(&self) -> Option<i32> {
        *self.0.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// 同步服务的外部依赖
#[derive(Clone)]
pub struct SyncDependencies {
    pub accounts: Arc<dyn AccountStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub history: Arc<dyn SyncHistoryStore>,
    pub cloud: Arc<dyn CloudProvider>,
    pub directory: Arc<dyn DirectoryProvider>,
    pub notifier: Arc<dyn NotificationSink>,
    pub cipher: SecretCipher,
}

pub struct SyncService {
    resolver: CredentialResolver,
    accounts: Arc<dyn AccountStore>,
    history: Arc<dyn SyncHistoryStore>,
    notifier: Arc<dyn NotificationSink>,
    workspaces: WorkspaceConnector,
    audit: AuditConnector,
    cost: CostConnector,
    usage: UsageEstimator,
    directory: DirectoryConnector,
    timeout: Duration,
}

impl SyncService {
    pub fn new(deps: SyncDependencies, config: &SyncConfig) -> Self {
        Self {
            resolver: CredentialResolver::new(
                deps.accounts.clone(),
                deps.settings.clone(),
                deps.cipher.clone(),
            ),
            workspaces: WorkspaceConnector::new(deps.inventory.clone(), deps.cloud.clone()),
            audit: AuditConnector::new(
                deps.inventory.clone(),
                deps.cloud.clone(),
                config.audit_lookback_days,
            ),
            cost: CostConnector::new(
                deps.inventory.clone(),
                deps.cloud.clone(),
                config.cost_lookback_days,
            ),
            usage: UsageEstimator::new(deps.inventory.clone()),
            directory: DirectoryConnector::new(deps.inventory, deps.directory),
            accounts: deps.accounts,
            history: deps.history,
            notifier: deps.notifier,
            timeout: config.timeout(),
        }
    }

    pub fn history(&self) -> &Arc<dyn SyncHistoryStore> {
        &self.history
    }

    /// NotStarted -> Running：在任何连接器调用之前写入历史记录
    pub async fn begin(&self, request: SyncRequest) -> Result<SyncHistory> {
        let history = self
            .history
            .create(request.sync_type.as_str(), request.target.account_id())
            .await?;

        metrics::counter!("sync.started", "type" => request.sync_type.as_str()).increment(1);
        info!(
            sync_id = history.id,
            sync_type = %request.sync_type,
            target = ?request.target,
            "Sync started"
        );
        Ok(history)
    }

    /// 同步执行：begin + execute
    pub async fn run(&self, request: SyncRequest) -> Result<SyncOutcome> {
        let history = self.begin(request).await?;
        Ok(self.execute(history.id, request).await)
    }

    /// Running -> Completed | Failed
    #[instrument(skip(self), fields(sync_type = %request.sync_type))]
    pub async fn execute(&self, sync_id: i32, request: SyncRequest) -> SyncOutcome {
        let in_flight = InFlight::default();
        let dispatched = tokio::time::timeout(self.timeout, self.dispatch(request, &in_flight)).await;
        let run = match dispatched {
            Ok(run) => run,
            Err(_) => {
                error!(sync_id, timeout_secs = self.timeout.as_secs(), "Sync timed out");
                let cancelled = in_flight.current().or(request.target.account_id());
                if let Some(id) = cancelled {
                    self.mark_account(id, false).await;
                }
                ConnectorRun::failed(0, SyncError::Timeout(self.timeout))
            }
        };

        self.finish(sync_id, request.sync_type, run).await
    }

    /// 通知并写入终态；通知与历史更新之间不保证原子性
    async fn finish(&self, sync_id: i32, sync_type: SyncType, run: ConnectorRun) -> SyncOutcome {
        let label = sync_type.as_str();
        let (status, error_message) = match &run.error {
            None => {
                self.notifier
                    .notify_sync_completed(label, run.processed)
                    .await;
                metrics::counter!("sync.completed", "type" => label).increment(1);
                (SyncStatus::Completed, None)
            }
            Some(e) => {
                let message = e.to_string();
                self.notifier.notify_sync_failed(label, &message).await;
                metrics::counter!("sync.failed", "type" => label).increment(1);
                (SyncStatus::Failed, Some(message))
            }
        };
        metrics::counter!("sync.records_processed", "type" => label)
            .increment(run.processed.max(0) as u64);

        if let Err(e) = self
            .history
            .complete(sync_id, status, run.processed, error_message.as_deref())
            .await
        {
            error!(sync_id, error = %e, "Failed to record sync completion");
        }

        match &error_message {
            None => info!(sync_id, records = run.processed, "Sync completed"),
            Some(message) => warn!(sync_id, records = run.processed, error = %message, "Sync failed"),
        }

        SyncOutcome {
            sync_id,
            status,
            records_processed: run.processed,
            error_message,
        }
    }

    async fn dispatch(&self, request: SyncRequest, in_flight: &InFlight) -> ConnectorRun {
        match request.target {
            SyncTarget::Account(id) => {
                self.sync_account_by_id(id, request.sync_type, in_flight)
                    .await
            }
            SyncTarget::AllAccounts => self.sync_all_accounts(request.sync_type, in_flight).await,
            SyncTarget::Default => self.sync_default(request.sync_type, in_flight).await,
        }
    }

    // ==================== Default target ====================

    /// 组合同步时 AWS 连接器共用一次账号解析，账号状态只按合并结果更新一次
    async fn sync_default(&self, sync_type: SyncType, in_flight: &InFlight) -> ConnectorRun {
        match sync_type {
            SyncType::Workspaces | SyncType::Cloudtrail | SyncType::Billing => {
                self.sync_aws(AccountRef::Default, &[sync_type], in_flight)
                    .await
            }
            SyncType::Usage => self.usage.run().await,
            SyncType::ActiveDirectory => self.sync_directory_default(in_flight).await,
            SyncType::All => {
                let mut total = self
                    .sync_aws(AccountRef::Default, &SyncType::AWS_CONNECTORS, in_flight)
                    .await;
                total.merge(self.usage.run().await);
                total.merge(self.sync_directory_default(in_flight).await);
                total
            }
        }
    }

    /// 存在目录服务器账号时逐个同步，否则走旧版设置
    async fn sync_directory_default(&self, in_flight: &InFlight) -> ConnectorRun {
        let servers = match self.accounts.list_active(AccountKind::Ldap).await {
            Ok(servers) => servers,
            Err(e) => return ConnectorRun::failed(0, e.into()),
        };
        if !servers.is_empty() {
            return self
                .fan_out(servers, SyncType::ActiveDirectory, in_flight)
                .await;
        }

        match self.resolver.legacy_directory_enabled().await {
            Ok(true) => {}
            Ok(false) => {
                info!("Active Directory sync disabled, skipping");
                return ConnectorRun::completed(0);
            }
            Err(e) => return e.into(),
        }
        match self.resolver.resolve_directory(AccountRef::Legacy).await {
            Ok(creds) => self.directory.run(&creds).await,
            Err(e) => e.into(),
        }
    }

    /// 对一个 AWS 账号引用依次执行连接器；解析到具体账号时更新其状态
    async fn sync_aws(
        &self,
        account: AccountRef,
        types: &[SyncType],
        in_flight: &InFlight,
    ) -> ConnectorRun {
        let found = match self.resolver.find_account(account, AccountKind::Aws).await {
            Ok(found) => found,
            Err(e) => return e.into(),
        };

        if let Some(acct) = &found {
            in_flight.enter(acct.id);
        }
        let run = match &found {
            Some(acct) => match self.resolver.aws_from_account(acct) {
                Ok(creds) => self.run_aws_connectors(&creds, types).await,
                Err(e) => e.into(),
            },
            None => match self.resolver.resolve_aws(AccountRef::Legacy).await {
                Ok(creds) => self.run_aws_connectors(&creds, types).await,
                Err(e) => e.into(),
            },
        };

        if let Some(acct) = &found {
            self.mark_account(acct.id, run.is_ok()).await;
            in_flight.leave();
        }
        run
    }

    async fn run_aws_connectors(&self, creds: &AwsCredentials, types: &[SyncType]) -> ConnectorRun {
        let mut total = ConnectorRun::default();
        for sync_type in types {
            let run = match sync_type {
                SyncType::Workspaces => self.workspaces.run(creds).await,
                SyncType::Cloudtrail => self.audit.run(creds).await,
                SyncType::Billing => self.cost.run(creds).await,
                other => ConnectorRun::failed(
                    0,
                    SyncError::Unsupported(format!("{} is not an AWS sync type", other)),
                ),
            };
            if let Some(e) = &run.error {
                warn!(step = %sync_type, error = %e, "Connector failed, continuing");
            }
            total.merge(run);
        }
        total
    }

    // ==================== Single account ====================

    async fn sync_account_by_id(
        &self,
        id: i32,
        sync_type: SyncType,
        in_flight: &InFlight,
    ) -> ConnectorRun {
        let account = match self.accounts.get(id).await {
            Ok(Some(account)) => account,
            Ok(None) => return SyncError::not_configured(format!("account {}", id)).into(),
            Err(e) => return ConnectorRun::failed(0, e.into()),
        };
        self.sync_account(&account, sync_type, in_flight).await
    }

    /// 单账号同步：账号类型决定可执行的连接器
    #[instrument(skip(self, account, in_flight), fields(account_id = account.id, kind = %account.kind))]
    async fn sync_account(
        &self,
        account: &SourceAccount,
        sync_type: SyncType,
        in_flight: &InFlight,
    ) -> ConnectorRun {
        match (account.kind, sync_type) {
            (AccountKind::Aws, SyncType::All) => {
                self.sync_aws(AccountRef::Id(account.id), &SyncType::AWS_CONNECTORS, in_flight)
                    .await
            }
            (AccountKind::Aws, SyncType::Workspaces | SyncType::Cloudtrail | SyncType::Billing) => {
                self.sync_aws(AccountRef::Id(account.id), &[sync_type], in_flight)
                    .await
            }
            (AccountKind::Ldap, SyncType::All | SyncType::ActiveDirectory) => {
                in_flight.enter(account.id);
                let run = match self.resolver.directory_from_account(account) {
                    Ok(creds) => self.directory.run(&creds).await,
                    Err(e) => e.into(),
                };
                self.mark_account(account.id, run.is_ok()).await;
                in_flight.leave();
                run
            }
            (kind, sync_type) => SyncError::Unsupported(format!(
                "sync type {} does not apply to {} account {}",
                sync_type, kind, account.name
            ))
            .into(),
        }
    }

    /// 账号状态始终反映最近一次尝试的结果
    async fn mark_account(&self, id: i32, succeeded: bool) {
        let result = if succeeded {
            self.accounts.record_sync(id).await
        } else {
            self.accounts.update_status(id, AccountStatus::Error).await
        };
        if let Err(e) = result {
            error!(account_id = id, error = %e, "Failed to update account status");
        }
    }

    // ==================== Fan-out ====================

    async fn sync_all_accounts(&self, sync_type: SyncType, in_flight: &InFlight) -> ConnectorRun {
        match sync_type {
            SyncType::Usage => self.usage.run().await,
            SyncType::All => {
                let mut total = self
                    .fan_out_kind(AccountKind::Aws, SyncType::All, in_flight)
                    .await;
                total.merge(self.usage.run().await);
                total.merge(
                    self.fan_out_kind(AccountKind::Ldap, SyncType::All, in_flight)
                        .await,
                );
                total
            }
            other => match other.account_kind() {
                Some(kind) => self.fan_out_kind(kind, other, in_flight).await,
                None => ConnectorRun::completed(0),
            },
        }
    }

    async fn fan_out_kind(
        &self,
        kind: AccountKind,
        sync_type: SyncType,
        in_flight: &InFlight,
    ) -> ConnectorRun {
        match self.accounts.list_active(kind).await {
            Ok(accounts) => self.fan_out(accounts, sync_type, in_flight).await,
            Err(e) => ConnectorRun::failed(0, e.into()),
        }
    }

    /// 逐个账号同步；单个账号失败不会中止，失败账号计 0
    async fn fan_out(
        &self,
        accounts: Vec<SourceAccount>,
        sync_type: SyncType,
        in_flight: &InFlight,
    ) -> ConnectorRun {
        let mut total = 0i64;
        let mut failed = 0usize;

        for account in accounts.iter().filter(|a| a.is_active) {
            if account.status == AccountStatus::Error {
                info!(
                    account_id = account.id,
                    name = %account.name,
                    "Skipping account in error state"
                );
                continue;
            }

            let run = self.sync_account(account, sync_type, in_flight).await;
            match run.error {
                None => total += run.processed,
                Some(e) => {
                    failed += 1;
                    error!(account_id = account.id, name = %account.name, error = %e, "Account sync failed");
                }
            }
        }

        info!(total, failed, "Multi-account sync finished");
        ConnectorRun::completed(total)
    }
}
