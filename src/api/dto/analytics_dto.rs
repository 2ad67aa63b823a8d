//! 分析 DTO
//!
//! 定义聚合接口与交易列表接口的请求和响应数据结构。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analytics::filter_builder::FilterParams;
use crate::error::{AppError, Result};
use crate::models::transaction::TransactionRecord;

/// 聚合查询参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialDataQuery {
    #[serde(flatten)]
    pub filter: FilterParams,
    /// 逗号分隔的目录项名称；缺省为全部
    pub aggregates: Option<String>,
    /// 调用方期望的超时（毫秒），不超过配置上限
    pub timeout_ms: Option<String>,
}

impl FinancialDataQuery {
    /// 解析超时；缺省时使用 `default`
    pub fn timeout(&self, default: Duration) -> Result<Duration> {
        match self.timeout_ms.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| {
                    AppError::Validation(format!("timeoutMs must be a positive integer, got {:?}", raw))
                }),
        }
    }
}

/// 交易列表查询参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(flatten)]
    pub filter: FilterParams,
}

fn positive(name: &str, raw: Option<&str>, default: usize) -> Result<usize> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                AppError::Validation(format!("{} must be a positive integer, got {:?}", name, raw))
            }),
    }
}

impl TransactionsQuery {
    /// (page, limit)；limit 截断到 `max_limit`
    pub fn paging(&self, default_limit: usize, max_limit: usize) -> Result<(usize, usize)> {
        let page = positive("page", self.page.as_deref(), 1)?;
        let limit = positive("limit", self.limit.as_deref(), default_limit)?.min(max_limit);
        Ok((page, limit))
    }
}

/// 交易分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub data: Vec<TransactionRecord>,
    pub total_documents: u64,
    pub total_pages: u64,
    pub current_page: usize,
}

impl TransactionPage {
    pub fn new(data: Vec<TransactionRecord>, total_documents: u64, page: usize, limit: usize) -> Self {
        Self {
            data,
            total_documents,
            total_pages: total_documents.div_ceil(limit as u64),
            current_page: page,
        }
    }
}
