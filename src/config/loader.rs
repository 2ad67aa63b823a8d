use crate::config::config::{AppConfig, DatabaseType};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 优先级（后者覆盖前者）：
    /// 1. 内置开发环境默认值
    /// 2. `FINDASH_CONFIG` 指定的文件，缺省为 ./config.toml
    /// 3. `FINDASH_` 前缀的环境变量，`__` 分隔层级，如 `FINDASH_SERVER__PORT`
    pub fn load() -> Result<AppConfig, figment::Error> {
        let path = std::env::var("FINDASH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        Self::load_from(&path)
    }

    /// 从指定路径加载配置
    pub fn load_from(path: &Path) -> Result<AppConfig, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("FINDASH_").ignore(&["config"]).split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        match config.database.backend {
            DatabaseType::SurrealDB if config.database.url.is_empty() => {
                return Err(ConfigValidationError::MissingDatabaseUrl);
            }
            DatabaseType::SurrealDB if config.database.table.is_empty() => {
                return Err(ConfigValidationError::MissingTable);
            }
            DatabaseType::Memory => match &config.database.data_path {
                None => return Err(ConfigValidationError::MissingDataPath),
                Some(path) if !path.exists() => {
                    return Err(ConfigValidationError::InvalidPath(
                        path.display().to_string(),
                    ));
                }
                Some(_) => {}
            },
            _ => {}
        }

        if config.analytics.timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if config.analytics.max_concurrency == 0 {
            return Err(ConfigValidationError::InvalidConcurrency);
        }

        if config.analytics.max_page_size == 0 {
            return Err(ConfigValidationError::InvalidPageSize);
        }

        if config.security.auth_enabled
            && config.security.api_keys.is_empty()
            && config.security.jwt_secret.is_empty()
        {
            return Err(ConfigValidationError::NoCredentials);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigValidationError {
    #[error("Server port must be greater than 0")]
    InvalidPort,

    #[error("Database URL is not configured")]
    MissingDatabaseUrl,

    #[error("Transaction table name is not configured")]
    MissingTable,

    #[error("Memory backend requires database.data_path")]
    MissingDataPath,

    #[error("analytics.timeout_ms must be greater than 0")]
    InvalidTimeout,

    #[error("analytics.max_concurrency must be greater than 0")]
    InvalidConcurrency,

    #[error("analytics.max_page_size must be greater than 0")]
    InvalidPageSize,

    #[error("Authentication is enabled but no API key or JWT secret is configured")]
    NoCredentials,

    #[error("Invalid config path: {0}")]
    InvalidPath(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}
