//! Aggregation Executor
//!
//! 并发执行一次请求中的全部目录项并组装为单个响应。任一目录项失败则整体失败，
//! 不返回部分结果；整个批次受同一个超时约束。

use futures_util::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analytics::catalog::{self, CatalogEntry};
use crate::error::{AppError, Result};
use crate::models::aggregate::AggregateValue;
use crate::models::filter::Filter;
use crate::storage::record_store::RecordStore;

/// 聚合响应，按目录项名称排序以保证输出稳定
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct AnalyticsReport {
    aggregates: BTreeMap<&'static str, AggregateValue>,
}

impl AnalyticsReport {
    pub fn get(&self, entry: CatalogEntry) -> Option<&AggregateValue> {
        self.aggregates.get(entry.name())
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AggregateValue)> {
        self.aggregates.iter().map(|(k, v)| (*k, v))
    }
}

/// 聚合执行器
#[derive(Clone)]
pub struct AggregationExecutor {
    store: Arc<dyn RecordStore>,
    timeout: Duration,
    max_concurrency: usize,
}

impl std::fmt::Debug for AggregationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationExecutor")
            .field("store", &self.store.backend_name())
            .field("timeout", &self.timeout)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl AggregationExecutor {
    pub fn new(store: Arc<dyn RecordStore>, timeout: Duration, max_concurrency: usize) -> Self {
        Self {
            store,
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// 配置的超时上限
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 使用默认超时执行
    pub async fn execute(&self, filter: &Filter, entries: &[CatalogEntry]) -> Result<AnalyticsReport> {
        self.execute_until(filter, entries, self.timeout, std::future::pending())
            .await
    }

    /// 执行并响应外部取消信号
    ///
    /// `cancel` 完成时放弃所有进行中的聚合并返回 `Cancelled`。
    /// 调用方请求的超时不会超过配置的上限。
    pub async fn execute_until<C>(
        &self,
        filter: &Filter,
        entries: &[CatalogEntry],
        timeout: Duration,
        cancel: C,
    ) -> Result<AnalyticsReport>
    where
        C: Future<Output = ()>,
    {
        let entries: Vec<CatalogEntry> = if entries.is_empty() {
            CatalogEntry::ALL.to_vec()
        } else {
            entries.to_vec()
        };
        let timeout = timeout.min(self.timeout);
        let started = Instant::now();

        debug!(?filter, aggregates = entries.len(), "Executing aggregation batch");

        let outcome = tokio::select! {
            biased;
            _ = cancel => {
                warn!("Aggregation batch cancelled by caller");
                Err(AppError::Cancelled)
            }
            result = tokio::time::timeout(timeout, self.run_all(filter, &entries)) => match result {
                Ok(report) => report,
                Err(_) => {
                    warn!(timeout_ms = timeout.as_millis() as u64, "Aggregation batch timed out");
                    Err(AppError::Timeout(timeout.as_millis() as u64))
                }
            },
        };

        if let Ok(report) = &outcome {
            info!(
                aggregates = report.len(),
                took_ms = started.elapsed().as_millis() as u64,
                backend = self.store.backend_name(),
                "Aggregation batch completed"
            );
        }
        outcome
    }

    async fn run_all(&self, filter: &Filter, entries: &[CatalogEntry]) -> Result<AnalyticsReport> {
        let store = self.store.as_ref();

        let computed: Vec<(CatalogEntry, AggregateValue)> = stream::iter(entries.iter().copied())
            .map(|entry| async move {
                let value = catalog::compute(store, filter, entry).await.map_err(|e| {
                    warn!(aggregate = entry.name(), "Aggregate computation failed: {}", e);
                    e.into_data_fetch()
                })?;
                Ok::<_, AppError>((entry, value))
            })
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await?;

        Ok(AnalyticsReport {
            aggregates: computed
                .into_iter()
                .map(|(entry, value)| (entry.name(), value))
                .collect(),
        })
    }
}
