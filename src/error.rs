//! 统一错误模型
//! 定义 HTTP 层错误、同步错误分类以及错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Sync queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::QueueFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(msg) => format!("Resource not found: {}", msg),
            AppError::BadRequest(msg) | AppError::Validation(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::QueueFull { .. } => "Too many syncs queued, retry later".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(msg) => format!("Internal server error: {}", msg),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    // 便捷方法
    pub fn not_found(msg: &str) -> Self {
        AppError::NotFound(msg.to_string())
    }

    pub fn validation(msg: &str) -> Self {
        AppError::Validation(msg.to_string())
    }

    pub fn internal_error(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
            },
        };

        // 记录错误日志
        tracing::error!(
            code = self.code(),
            message = %self,
            request_id = %error_response.error.request_id,
            "Application error"
        );

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// 同步错误
///
/// `Display` 的文本会原样写入 `sync_history.error_message` 并推送给通知渠道。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 凭证缺失或为空字符串
    #[error("{0} not configured")]
    NotConfigured(String),

    /// 无法连接到外部服务
    #[error("connection failed: {0}")]
    Connectivity(String),

    /// 外部服务拒绝了凭证
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// 分页拉取失败
    #[error("failed to get page: {0}")]
    Fetch(String),

    #[error("storage error: {0}")]
    Store(#[from] AppError),

    #[error("credential decryption failed: {0}")]
    Crypto(String),

    /// 同步类型不适用于该账号
    #[error("{0}")]
    Unsupported(String),

    #[error("sync timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl SyncError {
    pub fn not_configured(what: impl Into<String>) -> Self {
        SyncError::NotConfigured(what.into())
    }

    pub fn connectivity(msg: impl Into<String>) -> Self {
        SyncError::Connectivity(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        SyncError::Fetch(msg.into())
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        SyncError::Store(AppError::Database(e))
    }
}

/// 单条记录映射失败，只会被记录日志，不会上抛到连接器层面
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: {value}")]
    InvalidValue { field: &'static str, value: String },
}
