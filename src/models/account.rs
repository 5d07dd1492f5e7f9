//! Source account domain models
//! 一个 Source Account 是一组外部凭证：AWS 账号或 LDAP/AD 目录服务器

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// 账号类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "account_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Aws,
    Ldap,
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountKind::Aws => write!(f, "aws"),
            AccountKind::Ldap => write!(f, "ldap"),
        }
    }
}

/// 账号连接状态，始终反映最近一次连接尝试（测试或同步）的结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// 尚未测试
    Pending,
    /// 连接正常
    Connected,
    /// 凭证有效但权限不足
    Limited,
    /// 最近一次尝试失败
    Error,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Pending => write!(f, "pending"),
            AccountStatus::Connected => write!(f, "connected"),
            AccountStatus::Limited => write!(f, "limited"),
            AccountStatus::Error => write!(f, "error"),
        }
    }
}

/// 已配置的外部凭证集
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SourceAccount {
    pub id: i32,
    pub kind: AccountKind,
    pub name: String,
    /// AWS 为 region，LDAP 为服务器 URL
    pub region_or_url: String,
    /// 加密后的凭证 JSON，永不输出
    #[serde(skip_serializing)]
    pub credentials: String,
    pub base_dn: Option<String>,
    pub search_filter: Option<String>,
    /// STS 返回的 12 位 AWS 账号 ID
    pub external_account_id: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub status: AccountStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 凭证明文，序列化为 JSON 后加密存储
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AccountSecrets {
    Aws {
        access_key_id: String,
        secret_access_key: Secret<String>,
    },
    Ldap {
        bind_dn: String,
        bind_password: Secret<String>,
    },
}

impl AccountSecrets {
    pub fn kind(&self) -> AccountKind {
        match self {
            AccountSecrets::Aws { .. } => AccountKind::Aws,
            AccountSecrets::Ldap { .. } => AccountKind::Ldap,
        }
    }

    /// 序列化为 JSON（包含明文，仅用于加密前）
    pub fn to_plain_json(&self) -> String {
        let value = match self {
            AccountSecrets::Aws {
                access_key_id,
                secret_access_key,
            } => serde_json::json!({
                "kind": "aws",
                "access_key_id": access_key_id,
                "secret_access_key": secret_access_key.expose_secret(),
            }),
            AccountSecrets::Ldap {
                bind_dn,
                bind_password,
            } => serde_json::json!({
                "kind": "ldap",
                "bind_dn": bind_dn,
                "bind_password": bind_password.expose_secret(),
            }),
        };
        value.to_string()
    }
}

impl std::fmt::Debug for AccountSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountSecrets::Aws { access_key_id, .. } => f
                .debug_struct("Aws")
                .field("access_key_id", access_key_id)
                .finish_non_exhaustive(),
            AccountSecrets::Ldap { bind_dn, .. } => f
                .debug_struct("Ldap")
                .field("bind_dn", bind_dn)
                .finish_non_exhaustive(),
        }
    }
}

/// 创建账号请求
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_new_account"))]
pub struct CreateAccountRequest {
    pub kind: AccountKind,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1))]
    pub region_or_url: String,
    /// AWS access key id 或 LDAP bind DN
    #[validate(length(min = 1))]
    pub principal: String,
    /// AWS secret access key 或 LDAP bind 密码
    pub secret: Secret<String>,
    pub base_dn: Option<String>,
    pub search_filter: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl CreateAccountRequest {
    pub fn secrets(&self) -> AccountSecrets {
        let secret = Secret::new(self.secret.expose_secret().clone());
        match self.kind {
            AccountKind::Aws => AccountSecrets::Aws {
                access_key_id: self.principal.clone(),
                secret_access_key: secret,
            },
            AccountKind::Ldap => AccountSecrets::Ldap {
                bind_dn: self.principal.clone(),
                bind_password: secret,
            },
        }
    }
}

fn validate_new_account(req: &CreateAccountRequest) -> Result<(), ValidationError> {
    if req.secret.expose_secret().is_empty() {
        return Err(ValidationError::new("secret_required"));
    }
    if req.kind == AccountKind::Ldap {
        if !is_ldap_url(&req.region_or_url) {
            return Err(ValidationError::new("ldap_url_scheme"));
        }
        if req.base_dn.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::new("base_dn_required"));
        }
    }
    Ok(())
}

pub(crate) fn is_ldap_url(url: &str) -> bool {
    url.starts_with("ldap://") || url.starts_with("ldaps://")
}

/// 更新账号请求，空字符串或缺省字段保持原值
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(max = 255))]
    pub name: Option<String>,
    pub region_or_url: Option<String>,
    pub principal: Option<String>,
    pub secret: Option<Secret<String>>,
    pub base_dn: Option<String>,
    pub search_filter: Option<String>,
    pub is_default: Option<bool>,
}

/// 写入仓库的新账号（凭证已加密）
#[derive(Debug, Clone)]
pub struct NewSourceAccount {
    pub kind: AccountKind,
    pub name: String,
    pub region_or_url: String,
    pub credentials: String,
    pub base_dn: Option<String>,
    pub search_filter: Option<String>,
    pub is_default: bool,
}

/// 写入仓库的账号变更（凭证已加密）
#[derive(Debug, Clone, Default)]
pub struct SourceAccountChanges {
    pub name: Option<String>,
    pub region_or_url: Option<String>,
    pub credentials: Option<String>,
    pub base_dn: Option<String>,
    pub search_filter: Option<String>,
    pub is_default: Option<bool>,
}
