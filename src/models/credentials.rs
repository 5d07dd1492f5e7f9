//! Resolved credentials handed to providers

use secrecy::Secret;

/// 已解析的 AWS 凭证
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    /// 来源账号；旧版设置为 None
    pub account_id: Option<i32>,
    pub account_name: String,
    pub access_key_id: String,
    pub secret_access_key: Secret<String>,
    pub region: String,
}

/// 已解析的目录服务凭证
#[derive(Debug, Clone)]
pub struct DirectoryCredentials {
    /// 来源账号；旧版设置为 None
    pub server_id: Option<i32>,
    pub name: String,
    pub url: String,
    pub bind_dn: String,
    pub bind_password: Secret<String>,
    pub base_dn: String,
    /// 包含 `{username}` 占位符的过滤器模板
    pub search_filter: Option<String>,
}
