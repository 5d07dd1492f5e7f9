//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:8080"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Secret<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// 设置项与账号凭证的加密密钥（显式注入，不使用全局常量）
    pub settings_encryption_key: Secret<String>,
}

/// 同步任务配置
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// 单次同步的整体超时（秒）
    pub timeout_secs: u64,
    /// 并发执行同步任务的 worker 数量
    pub worker_count: usize,
    /// 等待队列容量，满时拒绝新的同步请求
    pub queue_capacity: usize,
    /// CloudTrail 回溯天数
    pub audit_lookback_days: i64,
    /// 账单回溯天数
    pub cost_lookback_days: i64,
    /// LDAP 连接超时（秒）
    pub ldap_connect_timeout_secs: u64,
    /// AWS 分页大小（CloudTrail 单页上限为 50）
    pub aws_page_size: i32,
}

impl SyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            worker_count: 4,
            queue_capacity: 32,
            audit_lookback_days: 7,
            cost_lookback_days: 30,
            ldap_connect_timeout_secs: 10,
            aws_page_size: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub sync: SyncConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = SyncConfig::default();
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:8080")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("sync.timeout_secs", defaults.timeout_secs)?
            .set_default("sync.worker_count", defaults.worker_count as u64)?
            .set_default("sync.queue_capacity", defaults.queue_capacity as u64)?
            .set_default("sync.audit_lookback_days", defaults.audit_lookback_days)?
            .set_default("sync.cost_lookback_days", defaults.cost_lookback_days)?
            .set_default("sync.ldap_connect_timeout_secs", defaults.ldap_connect_timeout_secs)?
            .set_default("sync.aws_page_size", i64::from(defaults.aws_page_size))?;

        // 从环境变量加载配置（前缀为 WSI_）
        settings = settings.add_source(
            Environment::with_prefix("WSI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if self.security.settings_encryption_key.expose_secret().is_empty() {
            return Err(ConfigError::Message(
                "settings_encryption_key must not be empty".to_string(),
            ));
        }

        // 验证同步配置
        if self.sync.timeout_secs == 0 {
            return Err(ConfigError::Message("sync.timeout_secs must be > 0".to_string()));
        }
        if self.sync.worker_count == 0 || self.sync.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "sync.worker_count and sync.queue_capacity must be > 0".to_string(),
            ));
        }
        if self.sync.audit_lookback_days <= 0 || self.sync.cost_lookback_days <= 0 {
            return Err(ConfigError::Message(
                "sync lookback windows must be at least one day".to_string(),
            ));
        }
        if !(1..=50).contains(&self.sync.aws_page_size) {
            return Err(ConfigError::Message(
                "sync.aws_page_size must be between 1 and 50".to_string(),
            ));
        }

        Ok(())
    }
}
