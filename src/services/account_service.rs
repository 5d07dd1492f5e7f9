//! Source account administration and connection testing

use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::credential_service::CredentialResolver;
use crate::crypto::SecretCipher;
use crate::error::{AppError, Result};
use crate::models::account::*;
use crate::providers::{CloudProvider, DirectoryProvider};
use crate::repository::{AccountStore, SettingsStore};

/// 连接测试结果
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionTestResult {
    pub account_id: i32,
    pub status: AccountStatus,
    pub external_account_id: Option<String>,
    pub message: String,
}

pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    resolver: CredentialResolver,
    cloud: Arc<dyn CloudProvider>,
    directory: Arc<dyn DirectoryProvider>,
    cipher: SecretCipher,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        settings: Arc<dyn SettingsStore>,
        cloud: Arc<dyn CloudProvider>,
        directory: Arc<dyn DirectoryProvider>,
        cipher: SecretCipher,
    ) -> Self {
        Self {
            resolver: CredentialResolver::new(accounts.clone(), settings, cipher.clone()),
            accounts,
            cloud,
            directory,
            cipher,
        }
    }

    fn seal(&self, secrets: &AccountSecrets) -> Result<String> {
        self.cipher
            .encrypt(&secrets.to_plain_json())
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    #[instrument(skip(self, request), fields(name = %request.name, kind = %request.kind))]
    pub async fn create(&self, request: CreateAccountRequest) -> Result<SourceAccount> {
        request.validate()?;

        let credentials = self.seal(&request.secrets())?;
        let account = self
            .accounts
            .create(NewSourceAccount {
                kind: request.kind,
                name: request.name.trim().to_string(),
                region_or_url: request.region_or_url.trim().to_string(),
                credentials,
                base_dn: request.base_dn,
                search_filter: request.search_filter,
                is_default: request.is_default,
            })
            .await?;

        info!(account_id = account.id, "Source account created");
        Ok(account)
    }

    #[instrument(skip(self, request))]
    pub async fn update(&self, id: i32, request: UpdateAccountRequest) -> Result<SourceAccount> {
        request.validate()?;

        let current = self
            .accounts
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("account"))?;

        if let Some(url) = request.region_or_url.as_deref().filter(|u| !u.is_empty()) {
            if current.kind == AccountKind::Ldap && !is_ldap_url(url) {
                return Err(AppError::validation(
                    "LDAP URL must start with ldap:// or ldaps://",
                ));
            }
        }

        // 只替换提供了的部分，另一半沿用已存储的凭证
        let principal = request.principal.filter(|p| !p.is_empty());
        let secret = request.secret.filter(|s| !s.expose_secret().is_empty());
        let credentials = if principal.is_some() || secret.is_some() {
            let existing = self.open(&current)?;
            let merged = match existing {
                AccountSecrets::Aws {
                    access_key_id,
                    secret_access_key,
                } => AccountSecrets::Aws {
                    access_key_id: principal.unwrap_or(access_key_id),
                    secret_access_key: secret.unwrap_or(secret_access_key),
                },
                AccountSecrets::Ldap {
                    bind_dn,
                    bind_password,
                } => AccountSecrets::Ldap {
                    bind_dn: principal.unwrap_or(bind_dn),
                    bind_password: secret.unwrap_or(bind_password),
                },
            };
            Some(self.seal(&merged)?)
        } else {
            None
        };

        let account = self
            .accounts
            .update(
                id,
                SourceAccountChanges {
                    name: request.name,
                    region_or_url: request.region_or_url,
                    credentials,
                    base_dn: request.base_dn,
                    search_filter: request.search_filter,
                    is_default: request.is_default,
                },
            )
            .await?;

        info!(account_id = id, "Source account updated");
        Ok(account)
    }

    /// 软删除
    pub async fn deactivate(&self, id: i32) -> Result<()> {
        self.accounts.deactivate(id).await?;
        info!(account_id = id, "Source account deactivated");
        Ok(())
    }

    pub async fn get(&self, id: i32) -> Result<SourceAccount> {
        self.accounts
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("account"))
    }

    pub async fn list(&self, kind: AccountKind) -> Result<Vec<SourceAccount>> {
        self.accounts.list_active(kind).await
    }

    fn open(&self, account: &SourceAccount) -> Result<AccountSecrets> {
        let plain = self
            .cipher
            .decrypt(&account.credentials)
            .map_err(|e| AppError::Internal(format!("failed to decrypt credentials: {}", e)))?;
        serde_json::from_str(&plain)
            .map_err(|e| AppError::Internal(format!("invalid stored credentials: {}", e)))
    }

    /// 测试连接并持久化结果状态
    #[instrument(skip(self))]
    pub async fn test_connection(&self, id: i32) -> Result<ConnectionTestResult> {
        let account = self.get(id).await?;

        let result = match account.kind {
            AccountKind::Aws => self.test_aws(&account).await,
            AccountKind::Ldap => self.test_directory(&account).await,
        };

        self.accounts.update_status(id, result.status).await?;
        if let Some(external_id) = result
            .external_account_id
            .as_deref()
            .filter(|id| !id.is_empty())
        {
            self.accounts.set_external_account_id(id, external_id).await?;
        }

        info!(account_id = id, status = %result.status, "Connection test finished");
        Ok(result)
    }

    async fn test_aws(&self, account: &SourceAccount) -> ConnectionTestResult {
        let outcome = match self.resolver.aws_from_account(account) {
            Ok(creds) => self.cloud.probe(&creds).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(probe) if probe.workspaces_access => ConnectionTestResult {
                account_id: account.id,
                status: AccountStatus::Connected,
                external_account_id: Some(probe.external_account_id),
                message: "Connection successful".to_string(),
            },
            Ok(probe) => ConnectionTestResult {
                account_id: account.id,
                status: AccountStatus::Limited,
                external_account_id: Some(probe.external_account_id),
                message: "Credentials valid but WorkSpaces access is denied".to_string(),
            },
            Err(e) => {
                warn!(account_id = account.id, error = %e, "AWS connection test failed");
                ConnectionTestResult {
                    account_id: account.id,
                    status: AccountStatus::Error,
                    external_account_id: None,
                    message: e.to_string(),
                }
            }
        }
    }

    async fn test_directory(&self, account: &SourceAccount) -> ConnectionTestResult {
        let session = match self.resolver.directory_from_account(account) {
            Ok(creds) => self.directory.connect(&creds).await,
            Err(e) => Err(e),
        };

        match session {
            Ok(mut session) => {
                session.close().await;
                ConnectionTestResult {
                    account_id: account.id,
                    status: AccountStatus::Connected,
                    external_account_id: None,
                    message: "Connection successful".to_string(),
                }
            }
            Err(e) => {
                warn!(account_id = account.id, error = %e, "Directory connection test failed");
                ConnectionTestResult {
                    account_id: account.id,
                    status: AccountStatus::Error,
                    external_account_id: None,
                    message: e.to_string(),
                }
            }
        }
    }
}

