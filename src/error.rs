//! 错误处理模块
//!
//! 定义应用程序的错误类型和错误处理逻辑。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 日期/年龄范围参数格式错误
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// 参数验证错误
    #[error("Invalid request: {0}")]
    Validation(String),

    /// 数据获取失败（存储调用或单个聚合失败）
    #[error("Unable to fetch financial data: {0}")]
    DataFetch(String),

    /// 超时错误
    #[error("Aggregation timed out after {0} ms")]
    Timeout(u64),

    /// 请求被调用方取消
    #[error("Request cancelled")]
    Cancelled,

    /// 缺少或无效的认证信息
    #[error("Unauthorized")]
    Unauthorized,

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(String),

    /// 连接错误
    #[error("Connection error: {0}")]
    Connection(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

#[cfg(feature = "surrealdb")]
impl From<surrealdb::Error> for AppError {
    fn from(e: surrealdb::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl AppError {
    /// 存储层错误统一包装为 DataFetch；已分类的请求级错误原样保留
    pub fn into_data_fetch(self) -> Self {
        match self {
            AppError::DataFetch(_)
            | AppError::Timeout(_)
            | AppError::Cancelled
            | AppError::InvalidRange(_)
            | AppError::Validation(_)
            | AppError::Unauthorized => self,
            other => AppError::DataFetch(other.to_string()),
        }
    }
}

/// Axum response implementation for AppError
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = (&self).into();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(code = %code, "Request failed: {}", self);
        } else {
            warn!(code = %code, "Request rejected: {}", self);
        }

        (status, Json(ErrorResponse::new(&code, &self.to_string()))).into_response()
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误消息
    pub error: String,
    /// 错误代码
    pub code: String,
}

impl ErrorResponse {
    /// 创建新错误响应
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: message.to_string(),
            code: code.to_string(),
        }
    }
}

/// HTTP 状态码映射
impl From<&AppError> for (u16, String) {
    fn from(err: &AppError) -> (u16, String) {
        match err {
            AppError::InvalidRange(_) => (400, "INVALID_RANGE".to_string()),
            AppError::Validation(_) => (400, "BAD_REQUEST".to_string()),
            AppError::Unauthorized => (401, "UNAUTHORIZED".to_string()),
            AppError::Cancelled => (499, "CLIENT_CLOSED_REQUEST".to_string()),
            AppError::DataFetch(_) => (500, "DATA_FETCH_ERROR".to_string()),
            AppError::Connection(_) => (503, "SERVICE_UNAVAILABLE".to_string()),
            AppError::Timeout(_) => (504, "TIMEOUT".to_string()),
            _ => (500, "INTERNAL_ERROR".to_string()),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
