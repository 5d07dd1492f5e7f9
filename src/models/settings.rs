//! Flat key-value settings used by the legacy credential path

/// 旧版 AWS 设置键
pub const AWS_REGION: &str = "aws.region";
pub const AWS_ACCESS_KEY_ID: &str = "aws.access_key_id";
pub const AWS_SECRET_ACCESS_KEY: &str = "aws.secret_access_key";

/// 旧版 AD 设置键
pub const AD_SYNC_ENABLED: &str = "ad.sync_enabled";
pub const AD_SERVER_URL: &str = "ad.server_url";
pub const AD_BASE_DN: &str = "ad.base_dn";
pub const AD_BIND_USERNAME: &str = "ad.bind_username";
pub const AD_BIND_PASSWORD: &str = "ad.bind_password";

/// 设置项（值已解密）
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Setting {
    pub key: String,
    pub value: Option<String>,
    pub encrypted: bool,
    pub category: Option<String>,
}
