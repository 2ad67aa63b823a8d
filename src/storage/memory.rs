//! 内存 Record Store
//!
//! 用于测试、演示以及 `memory` 后端（从 JSON 文件加载记录）。

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::aggregate::{DimensionValue, GroupRow};
use crate::models::filter::Filter;
use crate::models::transaction::TransactionRecord;
use crate::storage::record_store::{Dimension, RecordStore};

/// 内存记录存储
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Vec<TransactionRecord>>,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    /// 从 JSON 数组文件加载
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<TransactionRecord> = serde_json::from_str(&raw)?;
        info!(
            "Loaded {} transaction records from {}",
            records.len(),
            path.display()
        );
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matching<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a TransactionRecord> {
        self.records.iter().filter(move |r| filter.matches(r))
    }
}

fn dimension_value(record: &TransactionRecord, dimension: Dimension) -> DimensionValue {
    match dimension {
        Dimension::Category => record.category.as_str().into(),
        Dimension::Merchant => record.merchant.as_str().into(),
        Dimension::Gender => record.gender.as_str().into(),
        Dimension::Age => match record.age_years() {
            Some(years) => years.into(),
            None => record.age.as_str().into(),
        },
        Dimension::Step => record.step.into(),
        Dimension::ZipcodeOri => record.zipcode_ori.as_str().into(),
        Dimension::ZipMerchant => record.zip_merchant.as_str().into(),
        Dimension::Fraud => i64::from(record.fraud).into(),
        Dimension::AmountBin => record.amount_bin().into(),
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn group(&self, filter: &Filter, dimensions: &[Dimension]) -> Result<Vec<GroupRow>> {
        let mut groups: HashMap<Vec<DimensionValue>, GroupRow> = HashMap::new();

        for record in self.matching(filter) {
            let key: Vec<DimensionValue> = dimensions
                .iter()
                .map(|d| dimension_value(record, *d))
                .collect();
            let group = groups.entry(key.clone()).or_insert_with(|| GroupRow {
                key,
                ..GroupRow::default()
            });
            group.count += 1;
            group.total_amount += record.amount;
            if record.is_fraud() {
                group.fraud_count += 1;
                group.fraud_amount += record.amount;
            }
        }

        Ok(groups.into_values().collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        Ok(self.matching(filter).count() as u64)
    }

    async fn list(
        &self,
        filter: &Filter,
        start: usize,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let mut records: Vec<&TransactionRecord> = self.matching(filter).collect();
        records.sort_by(|a, b| a.step.cmp(&b.step).then_with(|| a.merchant.cmp(&b.merchant)));
        Ok(records.into_iter().skip(start).take(limit).cloned().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl From<Vec<TransactionRecord>> for MemoryRecordStore {
    fn from(records: Vec<TransactionRecord>) -> Self {
        Self::new(records)
    }
}

/// 加载失败时给出带路径的配置错误
pub fn load_memory_store(path: &Path) -> Result<MemoryRecordStore> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Data file not found: {}",
            path.display()
        )));
    }
    MemoryRecordStore::from_json_file(path)
}
