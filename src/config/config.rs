use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 存储后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// SurrealDB
    #[default]
    SurrealDB,
    /// 从 JSON 文件加载的内存存储
    Memory,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 存储后端
    pub backend: DatabaseType,
    /// SurrealDB 连接地址
    pub url: String,
    /// 命名空间
    pub namespace: String,
    /// 数据库名称
    pub database: String,
    /// 用户名
    pub username: String,
    /// 密码
    pub password: String,
    /// 交易记录表名
    pub table: String,
    /// 内存后端的数据文件（JSON 数组）
    pub data_path: Option<PathBuf>,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
}

/// 聚合配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// 单次请求所有聚合的总超时（毫秒），同时是调用方可请求的上限
    pub timeout_ms: u64,
    /// 同时进行的聚合数上限
    pub max_concurrency: usize,
    /// 交易列表默认分页大小
    pub default_page_size: usize,
    /// 交易列表最大分页大小
    pub max_page_size: usize,
}

/// 安全配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// 是否要求认证
    pub auth_enabled: bool,
    /// 有效的 API 密钥
    pub api_keys: Vec<String>,
    /// JWT 密钥；为空时不接受 Bearer token
    pub jwt_secret: String,
    /// JWT issuer
    pub jwt_issuer: String,
    /// JWT audience
    pub jwt_audience: String,
    /// CORS 允许的来源
    pub cors_allowed_origins: Vec<String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 服务器配置
    pub server: ServerConfig,
    /// 聚合配置
    pub analytics: AnalyticsConfig,
    /// 安全配置
    pub security: SecurityConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                backend: DatabaseType::SurrealDB,
                url: "ws://localhost:8000".into(),
                namespace: "findash".into(),
                database: "finance".into(),
                username: "root".into(),
                password: "root".into(),
                table: "transaction".into(),
                data_path: None,
            },
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
            },
            analytics: AnalyticsConfig {
                timeout_ms: 10_000,
                max_concurrency: 8,
                default_page_size: 10,
                max_page_size: 100,
            },
            security: SecurityConfig {
                auth_enabled: false,
                api_keys: vec!["dev-api-key-change-in-production".into()],
                jwt_secret: String::new(),
                jwt_issuer: "findash".into(),
                jwt_audience: "findash-api".into(),
                cors_allowed_origins: vec!["http://localhost:3000".into()],
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "findash".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.security.auth_enabled = true;
        config.security.api_keys.clear();
        config
    }
}
