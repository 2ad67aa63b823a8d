//! Record Store 抽象
//!
//! 聚合层只依赖"按过滤条件筛选、按字段分组并求和/计数"的能力，
//! 任何具备该能力的存储都可以实现 `RecordStore`。

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::models::aggregate::GroupRow;
use crate::models::filter::Filter;
use crate::models::transaction::TransactionRecord;

/// 分组维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Category,
    Merchant,
    Gender,
    /// 原始字符串年龄
    Age,
    Step,
    ZipcodeOri,
    ZipMerchant,
    Fraud,
    /// round(amount / 100)
    AmountBin,
}

/// 维度值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    Int,
    Text,
    /// 可解析时为整数，否则保留原始字符串
    Age,
}

impl Dimension {
    /// 文档中的字段名（AmountBin 为派生字段）
    pub fn field(&self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Merchant => "merchant",
            Dimension::Gender => "gender",
            Dimension::Age => "age",
            Dimension::Step => "step",
            Dimension::ZipcodeOri => "zipcodeOri",
            Dimension::ZipMerchant => "zipMerchant",
            Dimension::Fraud => "fraud",
            Dimension::AmountBin => "amountBin",
        }
    }

    pub fn kind(&self) -> DimensionKind {
        match self {
            Dimension::Step | Dimension::Fraud | Dimension::AmountBin => DimensionKind::Int,
            Dimension::Age => DimensionKind::Age,
            _ => DimensionKind::Text,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// 交易记录存储
///
/// 所有方法只读。`group` 返回的行顺序不作保证，排序由聚合目录负责；
/// 维度为空时表示全量汇总，过滤结果为空则返回空列表。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 过滤后按维度分组，返回每组的计数与求和
    async fn group(&self, filter: &Filter, dimensions: &[Dimension]) -> Result<Vec<GroupRow>>;

    /// 过滤后的记录数
    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// 分页列出记录，按 step、merchant 排序
    async fn list(&self, filter: &Filter, start: usize, limit: usize)
    -> Result<Vec<TransactionRecord>>;

    /// 连通性检查
    async fn ping(&self) -> Result<()>;

    /// 存储类型名称
    fn backend_name(&self) -> &'static str;
}
