//! Credential resolver
//!
//! 将账号引用解析为可直接使用的凭证，不修改任何状态。
//! 空字符串与缺失同等对待。

use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;

use crate::crypto::SecretCipher;
use crate::error::SyncError;
use crate::models::{
    account::{AccountKind, AccountSecrets, SourceAccount},
    credentials::{AwsCredentials, DirectoryCredentials},
    settings,
};
use crate::repository::{AccountStore, SettingsStore};

/// 账号引用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRef {
    /// 指定的 Source Account
    Id(i32),
    /// 默认账号，没有则回退到旧版设置
    Default,
    /// 只读取旧版设置
    Legacy,
}

pub struct CredentialResolver {
    accounts: Arc<dyn AccountStore>,
    settings: Arc<dyn SettingsStore>,
    cipher: SecretCipher,
}

fn required(value: Option<String>, what: &str) -> Result<String, SyncError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SyncError::not_configured(what))
}

impl CredentialResolver {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        settings: Arc<dyn SettingsStore>,
        cipher: SecretCipher,
    ) -> Self {
        Self {
            accounts,
            settings,
            cipher,
        }
    }

    /// 按引用查找账号；Legacy 或无默认账号时返回 None
    pub async fn find_account(
        &self,
        account: AccountRef,
        kind: AccountKind,
    ) -> Result<Option<SourceAccount>, SyncError> {
        match account {
            AccountRef::Id(id) => {
                let found = self
                    .accounts
                    .get(id)
                    .await?
                    .ok_or_else(|| SyncError::not_configured(format!("account {}", id)))?;
                if found.kind != kind {
                    return Err(SyncError::Unsupported(format!(
                        "account {} is a {} account, expected {}",
                        id, found.kind, kind
                    )));
                }
                Ok(Some(found))
            }
            AccountRef::Default => Ok(self.accounts.get_default(kind).await?),
            AccountRef::Legacy => Ok(None),
        }
    }

    pub async fn resolve_aws(&self, account: AccountRef) -> Result<AwsCredentials, SyncError> {
        match self.find_account(account, AccountKind::Aws).await? {
            Some(found) => self.aws_from_account(&found),
            None => self.legacy_aws().await,
        }
    }

    pub async fn resolve_directory(
        &self,
        account: AccountRef,
    ) -> Result<DirectoryCredentials, SyncError> {
        match self.find_account(account, AccountKind::Ldap).await? {
            Some(found) => self.directory_from_account(&found),
            None => self.legacy_directory().await,
        }
    }

    /// 解密账号凭证
    fn secrets_of(&self, account: &SourceAccount) -> Result<AccountSecrets, SyncError> {
        if account.credentials.trim().is_empty() {
            return Err(SyncError::not_configured(format!(
                "credentials for account {}",
                account.name
            )));
        }
        let plain = self
            .cipher
            .decrypt(&account.credentials)
            .map_err(|e| SyncError::Crypto(e.to_string()))?;
        serde_json::from_str(&plain).map_err(|e| SyncError::Crypto(e.to_string()))
    }

    pub fn aws_from_account(&self, account: &SourceAccount) -> Result<AwsCredentials, SyncError> {
        let what = format!("AWS credentials for account {}", account.name);
        match self.secrets_of(account)? {
            AccountSecrets::Aws {
                access_key_id,
                secret_access_key,
            } => {
                let access_key_id = required(Some(access_key_id), &what)?;
                if secret_access_key.expose_secret().is_empty() {
                    return Err(SyncError::not_configured(what));
                }
                Ok(AwsCredentials {
                    account_id: Some(account.id),
                    account_name: account.name.clone(),
                    access_key_id,
                    secret_access_key,
                    region: required(Some(account.region_or_url.clone()), &what)?,
                })
            }
            AccountSecrets::Ldap { .. } => Err(SyncError::Unsupported(format!(
                "account {} does not hold AWS credentials",
                account.name
            ))),
        }
    }

    pub fn directory_from_account(
        &self,
        account: &SourceAccount,
    ) -> Result<DirectoryCredentials, SyncError> {
        let what = format!("directory server {}", account.name);
        match self.secrets_of(account)? {
            AccountSecrets::Ldap {
                bind_dn,
                bind_password,
            } => Ok(DirectoryCredentials {
                server_id: Some(account.id),
                name: account.name.clone(),
                url: required(Some(account.region_or_url.clone()), &what)?,
                bind_dn: required(Some(bind_dn), &what)?,
                bind_password,
                base_dn: required(account.base_dn.clone(), &what)?,
                search_filter: account.search_filter.clone(),
            }),
            AccountSecrets::Aws { .. } => Err(SyncError::Unsupported(format!(
                "account {} does not hold directory credentials",
                account.name
            ))),
        }
    }

    async fn setting(&self, key: &str) -> Result<Option<String>, SyncError> {
        Ok(self.settings.get_setting(key).await?)
    }

    async fn legacy_aws(&self) -> Result<AwsCredentials, SyncError> {
        const WHAT: &str = "AWS credentials";
        let region = required(self.setting(settings::AWS_REGION).await?, WHAT)?;
        let access_key_id = required(self.setting(settings::AWS_ACCESS_KEY_ID).await?, WHAT)?;
        let secret = required(self.setting(settings::AWS_SECRET_ACCESS_KEY).await?, WHAT)?;

        Ok(AwsCredentials {
            account_id: None,
            account_name: "legacy".to_string(),
            access_key_id,
            secret_access_key: Secret::new(secret),
            region,
        })
    }

    /// 旧版 AD 同步是否开启（ad.sync_enabled == "true"）
    pub async fn legacy_directory_enabled(&self) -> Result<bool, SyncError> {
        Ok(self.setting(settings::AD_SYNC_ENABLED).await?.as_deref() == Some("true"))
    }

    async fn legacy_directory(&self) -> Result<DirectoryCredentials, SyncError> {
        const WHAT: &str = "Active Directory";
        let url = required(self.setting(settings::AD_SERVER_URL).await?, WHAT)?;
        let base_dn = required(self.setting(settings::AD_BASE_DN).await?, WHAT)?;
        let bind_dn = required(self.setting(settings::AD_BIND_USERNAME).await?, WHAT)?;
        let password = required(self.setting(settings::AD_BIND_PASSWORD).await?, WHAT)?;

        Ok(DirectoryCredentials {
            server_id: None,
            name: "legacy".to_string(),
            url,
            bind_dn,
            bind_password: Secret::new(password),
            base_dn,
            search_filter: None,
        })
    }
}
