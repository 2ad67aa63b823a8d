//! 存储工厂模块
//!
//! 根据配置创建相应的 Record Store。进程启动时创建一次，之后以 `Arc` 共享。

use std::sync::Arc;
use tracing::info;

use crate::config::config::{DatabaseConfig, DatabaseType};
use crate::error::{AppError, Result};
use crate::storage::memory::load_memory_store;
use crate::storage::record_store::RecordStore;

#[cfg(feature = "surrealdb")]
use crate::storage::surrealdb::{SurrealPool, SurrealRecordStore};

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建存储实例
    pub async fn create(config: &DatabaseConfig) -> Result<Arc<dyn RecordStore>> {
        match config.backend {
            DatabaseType::SurrealDB => Self::create_surrealdb(config).await,
            DatabaseType::Memory => {
                let path = config.data_path.as_deref().ok_or_else(|| {
                    AppError::Config("Memory backend requires database.data_path".into())
                })?;
                let store = load_memory_store(path)?;
                info!("Memory record store ready with {} records", store.len());
                Ok(Arc::new(store))
            }
        }
    }

    #[cfg(feature = "surrealdb")]
    async fn create_surrealdb(config: &DatabaseConfig) -> Result<Arc<dyn RecordStore>> {
        let pool = SurrealPool::new(config.clone())
            .await
            .map_err(|e| AppError::Connection(e.to_string()))?;
        info!(
            "SurrealDB record store connected: {} ({}/{}, table {})",
            config.url, config.namespace, config.database, config.table
        );
        Ok(Arc::new(SurrealRecordStore::new(pool)))
    }

    #[cfg(not(feature = "surrealdb"))]
    async fn create_surrealdb(_config: &DatabaseConfig) -> Result<Arc<dyn RecordStore>> {
        Err(AppError::Config(
            "SurrealDB feature is not enabled. Enable 'surrealdb' feature or use the memory backend."
                .into(),
        ))
    }

    /// 检查存储是否可用
    pub async fn health_check(store: &dyn RecordStore) -> Result<bool> {
        store.ping().await.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_memory_backend_from_file() {
        let path = std::env::temp_dir().join(format!("findash-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{"step":0,"age":"4","gender":"M","zipcodeOri":"28007","merchant":"M1","zipMerchant":"28007","category":"es_food","amount":12.5,"fraud":0}}]"#
        )
        .unwrap();

        let config = DatabaseConfig {
            backend: DatabaseType::Memory,
            data_path: Some(path.clone()),
            ..DatabaseConfig::default()
        };
        let store = StorageFactory::create(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert!(StorageFactory::health_check(store.as_ref()).await.unwrap());

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_memory_backend_requires_path() {
        let config = DatabaseConfig {
            backend: DatabaseType::Memory,
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            StorageFactory::create(&config).await,
            Err(AppError::Config(_))
        ));
    }
}
