//! 聚合结果模型
//!
//! 存储层返回 `GroupRow`，目录层据此派生各图表所需的行类型。

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;

use crate::models::transaction::parse_age;

/// 分组键中的单个维度值
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionValue {
    Int(i64),
    Text(String),
}

impl DimensionValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DimensionValue::Int(v) => Some(*v),
            DimensionValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            DimensionValue::Int(v) => Cow::Owned(v.to_string()),
            DimensionValue::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl From<i64> for DimensionValue {
    fn from(v: i64) -> Self {
        DimensionValue::Int(v)
    }
}

impl From<&str> for DimensionValue {
    fn from(v: &str) -> Self {
        DimensionValue::Text(v.to_string())
    }
}

impl From<String> for DimensionValue {
    fn from(v: String) -> Self {
        DimensionValue::Text(v)
    }
}

/// 存储层分组结果
///
/// 一组记录的计数与求和；所有目录项都由它派生。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupRow {
    /// 分组键，与请求的维度一一对应
    pub key: Vec<DimensionValue>,
    /// 记录数
    pub count: u64,
    /// 金额合计
    pub total_amount: f64,
    /// 欺诈记录数
    pub fraud_count: u64,
    /// 欺诈金额合计
    pub fraud_amount: f64,
}

impl GroupRow {
    pub fn text(&self, idx: usize) -> String {
        self.key
            .get(idx)
            .map(|v| v.as_text().into_owned())
            .unwrap_or_default()
    }

    pub fn int(&self, idx: usize) -> i64 {
        self.key.get(idx).and_then(DimensionValue::as_int).unwrap_or_default()
    }

    pub fn age(&self, idx: usize) -> AgeValue {
        match self.key.get(idx) {
            Some(DimensionValue::Int(years)) => AgeValue::Years(*years),
            Some(DimensionValue::Text(raw)) => AgeValue::from_raw(raw),
            None => AgeValue::Raw(String::new()),
        }
    }
}

/// 比率：分母为 0 或结果非有限值时为 None（序列化为 null）
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

/// 年龄分组值
///
/// 可解析时按数值输出和排序，其余保留原始字符串并排在数值之后。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgeValue {
    Years(i64),
    Raw(String),
}

impl AgeValue {
    pub fn from_raw(raw: &str) -> Self {
        match parse_age(raw) {
            Some(years) => AgeValue::Years(years),
            None => AgeValue::Raw(raw.to_string()),
        }
    }
}

impl Ord for AgeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AgeValue::Years(a), AgeValue::Years(b)) => a.cmp(b),
            (AgeValue::Years(_), AgeValue::Raw(_)) => Ordering::Less,
            (AgeValue::Raw(_), AgeValue::Years(_)) => Ordering::Greater,
            (AgeValue::Raw(a), AgeValue::Raw(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for AgeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// 按类别统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow {
    pub category: String,
    pub total_count: u64,
    pub total_amount: f64,
    pub fraud_count: u64,
    /// fraudCount / totalCount
    pub fraud_rate: Option<f64>,
}

/// 按商户统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantRow {
    pub merchant: String,
    pub total_count: u64,
    pub total_amount: f64,
    pub fraud_amount: f64,
    /// fraudAmount / totalAmount
    pub fraud_rate: Option<f64>,
}

/// 按客户邮编的欺诈率
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipcodeFraudRow {
    pub zipcode: String,
    pub total_count: u64,
    pub fraud_count: u64,
    pub fraud_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeCountRow {
    pub age: AgeValue,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderCountRow {
    pub gender: String,
    pub count: u64,
}

/// 时间序列点
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRow {
    pub step: i64,
    pub fraud_count: u64,
    pub total_count: u64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTrendRow {
    pub category: String,
    pub step: i64,
    pub total_amount: f64,
}

/// 客户分群（年龄 × 性别 [× 类别]）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRow {
    pub age: AgeValue,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub total_count: u64,
    pub total_amount: f64,
    pub avg_amount: Option<f64>,
    pub fraud_count: u64,
}

/// 金额分箱 × 欺诈标记
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudIndicatorRow {
    pub amount_bin: i64,
    pub fraud: i64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoRow {
    pub customer_zip: String,
    pub merchant_zip: String,
    pub fraud: i64,
    pub total_count: u64,
    pub total_amount: f64,
}

/// 单个目录项的计算结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregateValue {
    Categories(Vec<CategoryRow>),
    Merchants(Vec<MerchantRow>),
    Zipcodes(Vec<ZipcodeFraudRow>),
    Ages(Vec<AgeCountRow>),
    Genders(Vec<GenderCountRow>),
    Steps(Vec<StepRow>),
    CategoryTrends(Vec<CategoryTrendRow>),
    Segments(Vec<SegmentRow>),
    FraudIndicators(Vec<FraudIndicatorRow>),
    Geography(Vec<GeoRow>),
    Scalar(Option<f64>),
}

impl AggregateValue {
    /// 行数；标量结果返回 None
    pub fn len(&self) -> Option<usize> {
        match self {
            AggregateValue::Categories(rows) => Some(rows.len()),
            AggregateValue::Merchants(rows) => Some(rows.len()),
            AggregateValue::Zipcodes(rows) => Some(rows.len()),
            AggregateValue::Ages(rows) => Some(rows.len()),
            AggregateValue::Genders(rows) => Some(rows.len()),
            AggregateValue::Steps(rows) => Some(rows.len()),
            AggregateValue::CategoryTrends(rows) => Some(rows.len()),
            AggregateValue::Segments(rows) => Some(rows.len()),
            AggregateValue::FraudIndicators(rows) => Some(rows.len()),
            AggregateValue::Geography(rows) => Some(rows.len()),
            AggregateValue::Scalar(_) => None,
        }
    }

    /// 各行记录数之和；用于跨聚合的一致性校验
    pub fn record_count(&self) -> Option<u64> {
        match self {
            AggregateValue::Categories(rows) => Some(rows.iter().map(|r| r.total_count).sum()),
            AggregateValue::Merchants(rows) => Some(rows.iter().map(|r| r.total_count).sum()),
            AggregateValue::Zipcodes(rows) => Some(rows.iter().map(|r| r.total_count).sum()),
            AggregateValue::Ages(rows) => Some(rows.iter().map(|r| r.count).sum()),
            AggregateValue::Genders(rows) => Some(rows.iter().map(|r| r.count).sum()),
            AggregateValue::Steps(rows) => Some(rows.iter().map(|r| r.total_count).sum()),
            AggregateValue::Segments(rows) => Some(rows.iter().map(|r| r.total_count).sum()),
            AggregateValue::FraudIndicators(rows) => Some(rows.iter().map(|r| r.count).sum()),
            AggregateValue::Geography(rows) => Some(rows.iter().map(|r| r.total_count).sum()),
            AggregateValue::CategoryTrends(_) | AggregateValue::Scalar(_) => None,
        }
    }
}
