//! Aggregation Catalog
//!
//! 每个目录项由一行配置描述：分组维度、行形状（派生字段与排序规则）、可选截断数。
//! 存储层只负责分组求和，派生字段、排序和截断全部在这里完成，
//! 因此同一 `Filter` 下的所有聚合口径一致。

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::aggregate::*;
use crate::models::filter::Filter;
use crate::storage::record_store::{Dimension, RecordStore};

/// 目录项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CatalogEntry {
    TransactionsByCategory,
    MerchantTotals,
    TransactionsByMerchant,
    TopMerchants,
    MerchantLeaderboard,
    FraudByZipcode,
    AgeDistribution,
    GenderDistribution,
    FraudOverTime,
    StepAnalysis,
    CategoryTrends,
    CustomerSegmentation,
    CustomerBehavior,
    FraudIndicators,
    GeographicalAnalysis,
    AverageTransactionAmount,
}

/// 行形状：决定派生字段与比较器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    ByCategory,
    ByMerchant,
    ZipcodeFraudRate,
    AgeCount,
    GenderCount,
    TimeSeries,
    CategoryTrend,
    Segment,
    FraudIndicator,
    Geographic,
    Average,
}

/// 目录项定义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateDefinition {
    pub dimensions: &'static [Dimension],
    pub shape: RowShape,
    pub cap: Option<usize>,
}

const fn def(
    dimensions: &'static [Dimension],
    shape: RowShape,
    cap: Option<usize>,
) -> AggregateDefinition {
    AggregateDefinition {
        dimensions,
        shape,
        cap,
    }
}

/// 商户排行：同一计算，按 N 参数化
pub const fn by_merchant(cap: Option<usize>) -> AggregateDefinition {
    def(&[Dimension::Merchant], RowShape::ByMerchant, cap)
}

impl CatalogEntry {
    pub const ALL: [CatalogEntry; 16] = [
        CatalogEntry::TransactionsByCategory,
        CatalogEntry::MerchantTotals,
        CatalogEntry::TransactionsByMerchant,
        CatalogEntry::TopMerchants,
        CatalogEntry::MerchantLeaderboard,
        CatalogEntry::FraudByZipcode,
        CatalogEntry::AgeDistribution,
        CatalogEntry::GenderDistribution,
        CatalogEntry::FraudOverTime,
        CatalogEntry::StepAnalysis,
        CatalogEntry::CategoryTrends,
        CatalogEntry::CustomerSegmentation,
        CatalogEntry::CustomerBehavior,
        CatalogEntry::FraudIndicators,
        CatalogEntry::GeographicalAnalysis,
        CatalogEntry::AverageTransactionAmount,
    ];

    /// 响应中的键名
    pub fn name(&self) -> &'static str {
        match self {
            CatalogEntry::TransactionsByCategory => "transactionsByCategory",
            CatalogEntry::MerchantTotals => "merchantTotals",
            CatalogEntry::TransactionsByMerchant => "transactionsByMerchant",
            CatalogEntry::TopMerchants => "topMerchants",
            CatalogEntry::MerchantLeaderboard => "merchantLeaderboard",
            CatalogEntry::FraudByZipcode => "fraudByZipcode",
            CatalogEntry::AgeDistribution => "ageDistribution",
            CatalogEntry::GenderDistribution => "genderDistribution",
            CatalogEntry::FraudOverTime => "fraudOverTime",
            CatalogEntry::StepAnalysis => "stepAnalysis",
            CatalogEntry::CategoryTrends => "categoryTrends",
            CatalogEntry::CustomerSegmentation => "customerSegmentation",
            CatalogEntry::CustomerBehavior => "customerBehavior",
            CatalogEntry::FraudIndicators => "fraudIndicators",
            CatalogEntry::GeographicalAnalysis => "geographicalAnalysis",
            CatalogEntry::AverageTransactionAmount => "averageTransactionAmount",
        }
    }

    pub fn definition(&self) -> AggregateDefinition {
        use Dimension::*;

        match self {
            CatalogEntry::TransactionsByCategory => def(&[Category], RowShape::ByCategory, None),
            CatalogEntry::MerchantTotals => by_merchant(None),
            CatalogEntry::TransactionsByMerchant => by_merchant(Some(10)),
            CatalogEntry::TopMerchants => by_merchant(Some(5)),
            CatalogEntry::MerchantLeaderboard => by_merchant(Some(20)),
            CatalogEntry::FraudByZipcode => def(&[ZipcodeOri], RowShape::ZipcodeFraudRate, Some(10)),
            CatalogEntry::AgeDistribution => def(&[Age], RowShape::AgeCount, None),
            CatalogEntry::GenderDistribution => def(&[Gender], RowShape::GenderCount, None),
            CatalogEntry::FraudOverTime | CatalogEntry::StepAnalysis => {
                def(&[Step], RowShape::TimeSeries, None)
            }
            CatalogEntry::CategoryTrends => def(&[Category, Step], RowShape::CategoryTrend, None),
            CatalogEntry::CustomerSegmentation => def(&[Age, Gender], RowShape::Segment, Some(20)),
            CatalogEntry::CustomerBehavior => {
                def(&[Age, Gender, Category], RowShape::Segment, Some(20))
            }
            CatalogEntry::FraudIndicators => def(&[AmountBin, Fraud], RowShape::FraudIndicator, None),
            CatalogEntry::GeographicalAnalysis => {
                def(&[ZipcodeOri, ZipMerchant, Fraud], RowShape::Geographic, Some(20))
            }
            CatalogEntry::AverageTransactionAmount => def(&[], RowShape::Average, None),
        }
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CatalogEntry {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        CatalogEntry::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::Validation(format!("Unknown aggregate: {}", s)))
    }
}

/// 解析逗号分隔的目录项列表；空值表示全部，重复项去重
pub fn parse_entries(raw: Option<&str>) -> Result<Vec<CatalogEntry>> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(CatalogEntry::ALL.to_vec());
    }

    let mut entries = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(CatalogEntry::from_str)
        .collect::<Result<Vec<_>>>()?;
    entries.sort();
    entries.dedup();
    Ok(entries)
}

/// 目录描述（用于 /aggregates 列表）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDescriptor {
    pub name: &'static str,
    pub group_by: Vec<Dimension>,
    pub cap: Option<usize>,
}

pub fn describe() -> Vec<CatalogDescriptor> {
    CatalogEntry::ALL
        .iter()
        .map(|e| {
            let d = e.definition();
            CatalogDescriptor {
                name: e.name(),
                group_by: d.dimensions.to_vec(),
                cap: d.cap,
            }
        })
        .collect()
}

/// 从存储计算单个目录项
pub async fn compute(
    store: &dyn RecordStore,
    filter: &Filter,
    entry: CatalogEntry,
) -> Result<AggregateValue> {
    let definition = entry.definition();
    let rows = store.group(filter, definition.dimensions).await?;
    Ok(shape_rows(&definition, rows))
}

fn desc_f64(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// 由 None 表示的比率排在最后
fn desc_rate(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn capped<T>(mut rows: Vec<T>, cap: Option<usize>) -> Vec<T> {
    if let Some(cap) = cap {
        rows.truncate(cap);
    }
    rows
}

/// 由分组结果派生行、排序并截断
pub fn shape_rows(definition: &AggregateDefinition, rows: Vec<GroupRow>) -> AggregateValue {
    let cap = definition.cap;

    match definition.shape {
        RowShape::ByCategory => {
            let mut out: Vec<CategoryRow> = rows
                .iter()
                .map(|r| CategoryRow {
                    category: r.text(0),
                    total_count: r.count,
                    total_amount: r.total_amount,
                    fraud_count: r.fraud_count,
                    fraud_rate: ratio(r.fraud_count as f64, r.count as f64),
                })
                .collect();
            out.sort_by(|a, b| {
                b.total_count
                    .cmp(&a.total_count)
                    .then_with(|| a.category.cmp(&b.category))
            });
            AggregateValue::Categories(capped(out, cap))
        }
        RowShape::ByMerchant => {
            let mut out: Vec<MerchantRow> = rows
                .iter()
                .map(|r| MerchantRow {
                    merchant: r.text(0),
                    total_count: r.count,
                    total_amount: r.total_amount,
                    fraud_amount: r.fraud_amount,
                    fraud_rate: ratio(r.fraud_amount, r.total_amount),
                })
                .collect();
            out.sort_by(|a, b| {
                desc_f64(a.total_amount, b.total_amount).then_with(|| a.merchant.cmp(&b.merchant))
            });
            AggregateValue::Merchants(capped(out, cap))
        }
        RowShape::ZipcodeFraudRate => {
            let mut out: Vec<ZipcodeFraudRow> = rows
                .iter()
                .filter(|r| r.count > 0)
                .map(|r| ZipcodeFraudRow {
                    zipcode: r.text(0),
                    total_count: r.count,
                    fraud_count: r.fraud_count,
                    fraud_rate: ratio(r.fraud_count as f64, r.count as f64),
                })
                .collect();
            out.sort_by(|a, b| {
                desc_rate(a.fraud_rate, b.fraud_rate).then_with(|| a.zipcode.cmp(&b.zipcode))
            });
            AggregateValue::Zipcodes(capped(out, cap))
        }
        RowShape::AgeCount => {
            let mut out: Vec<AgeCountRow> = rows
                .iter()
                .map(|r| AgeCountRow {
                    age: r.age(0),
                    count: r.count,
                })
                .collect();
            out.sort_by(|a, b| a.age.cmp(&b.age));
            AggregateValue::Ages(capped(out, cap))
        }
        RowShape::GenderCount => {
            let mut out: Vec<GenderCountRow> = rows
                .iter()
                .map(|r| GenderCountRow {
                    gender: r.text(0),
                    count: r.count,
                })
                .collect();
            out.sort_by(|a, b| a.gender.cmp(&b.gender));
            AggregateValue::Genders(capped(out, cap))
        }
        RowShape::TimeSeries => {
            let mut out: Vec<StepRow> = rows
                .iter()
                .map(|r| StepRow {
                    step: r.int(0),
                    fraud_count: r.fraud_count,
                    total_count: r.count,
                    total_amount: r.total_amount,
                })
                .collect();
            out.sort_by_key(|r| r.step);
            AggregateValue::Steps(capped(out, cap))
        }
        RowShape::CategoryTrend => {
            let mut out: Vec<CategoryTrendRow> = rows
                .iter()
                .map(|r| CategoryTrendRow {
                    category: r.text(0),
                    step: r.int(1),
                    total_amount: r.total_amount,
                })
                .collect();
            out.sort_by(|a, b| {
                a.step
                    .cmp(&b.step)
                    .then_with(|| desc_f64(a.total_amount, b.total_amount))
                    .then_with(|| a.category.cmp(&b.category))
            });
            AggregateValue::CategoryTrends(capped(out, cap))
        }
        RowShape::Segment => {
            let with_category = definition.dimensions.len() > 2;
            let mut out: Vec<SegmentRow> = rows
                .iter()
                .map(|r| SegmentRow {
                    age: r.age(0),
                    gender: r.text(1),
                    category: with_category.then(|| r.text(2)),
                    total_count: r.count,
                    total_amount: r.total_amount,
                    avg_amount: ratio(r.total_amount, r.count as f64),
                    fraud_count: r.fraud_count,
                })
                .collect();
            out.sort_by(|a, b| {
                b.total_count
                    .cmp(&a.total_count)
                    .then_with(|| a.age.cmp(&b.age))
                    .then_with(|| a.gender.cmp(&b.gender))
                    .then_with(|| a.category.cmp(&b.category))
            });
            AggregateValue::Segments(capped(out, cap))
        }
        RowShape::FraudIndicator => {
            let mut out: Vec<FraudIndicatorRow> = rows
                .iter()
                .map(|r| FraudIndicatorRow {
                    amount_bin: r.int(0),
                    fraud: r.int(1),
                    count: r.count,
                })
                .collect();
            out.sort_by_key(|r| (r.amount_bin, r.fraud));
            AggregateValue::FraudIndicators(capped(out, cap))
        }
        RowShape::Geographic => {
            let mut out: Vec<GeoRow> = rows
                .iter()
                .map(|r| GeoRow {
                    customer_zip: r.text(0),
                    merchant_zip: r.text(1),
                    fraud: r.int(2),
                    total_count: r.count,
                    total_amount: r.total_amount,
                })
                .collect();
            out.sort_by(|a, b| {
                b.total_count
                    .cmp(&a.total_count)
                    .then_with(|| a.customer_zip.cmp(&b.customer_zip))
                    .then_with(|| a.merchant_zip.cmp(&b.merchant_zip))
                    .then_with(|| a.fraud.cmp(&b.fraud))
            });
            AggregateValue::Geography(capped(out, cap))
        }
        RowShape::Average => {
            let (count, total) = rows
                .iter()
                .fold((0u64, 0.0f64), |(c, t), r| (c + r.count, t + r.total_amount));
            AggregateValue::Scalar(ratio(total, count as f64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(key: Vec<DimensionValue>, count: u64, total: f64, fraud: u64, fraud_amt: f64) -> GroupRow {
        GroupRow {
            key,
            count,
            total_amount: total,
            fraud_count: fraud,
            fraud_amount: fraud_amt,
        }
    }

    #[test]
    fn test_entry_names_round_trip() {
        for entry in CatalogEntry::ALL {
            assert_eq!(entry.name().parse::<CatalogEntry>().unwrap(), entry);
        }
        assert!("nope".parse::<CatalogEntry>().is_err());
    }

    #[test]
    fn test_parse_entries_defaults_to_all_and_dedups() {
        assert_eq!(parse_entries(None).unwrap().len(), CatalogEntry::ALL.len());
        assert_eq!(parse_entries(Some("  ")).unwrap().len(), CatalogEntry::ALL.len());

        let entries = parse_entries(Some("topMerchants, ageDistribution,topMerchants")).unwrap();
        assert_eq!(
            entries,
            vec![CatalogEntry::TopMerchants, CatalogEntry::AgeDistribution]
        );
    }

    #[test]
    fn test_parse_entries_rejects_unknown_name() {
        let err = parse_entries(Some("topMerchants,bogus")).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m.contains("bogus")));
    }

    #[test]
    fn test_merchant_variants_share_one_definition() {
        let caps: Vec<Option<usize>> = [
            CatalogEntry::MerchantTotals,
            CatalogEntry::TransactionsByMerchant,
            CatalogEntry::TopMerchants,
            CatalogEntry::MerchantLeaderboard,
        ]
        .iter()
        .map(|e| {
            let d = e.definition();
            assert_eq!(d.shape, RowShape::ByMerchant);
            assert_eq!(d.dimensions, &[Dimension::Merchant]);
            d.cap
        })
        .collect();
        assert_eq!(caps, vec![None, Some(10), Some(5), Some(20)]);
    }

    #[test]
    fn test_category_ties_break_by_name() {
        let rows = vec![
            group(vec!["es_travel".into()], 2, 10.0, 0, 0.0),
            group(vec!["es_food".into()], 2, 10.0, 1, 5.0),
            group(vec!["es_health".into()], 3, 10.0, 0, 0.0),
        ];
        let value = shape_rows(&CatalogEntry::TransactionsByCategory.definition(), rows);
        let AggregateValue::Categories(rows) = value else {
            panic!("expected categories");
        };
        let names: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["es_health", "es_food", "es_travel"]);
        assert_eq!(rows[1].fraud_rate, Some(0.5));
    }

    #[test]
    fn test_merchant_rate_is_amount_based_and_null_on_zero_total() {
        let rows = vec![
            group(vec!["M1".into()], 2, 200.0, 1, 150.0),
            group(vec!["M2".into()], 1, 0.0, 0, 0.0),
        ];
        let AggregateValue::Merchants(rows) = shape_rows(&by_merchant(None), rows) else {
            panic!("expected merchants");
        };
        assert_eq!(rows[0].fraud_rate, Some(0.75));
        assert_eq!(rows[1].fraud_rate, None);
    }

    #[test]
    fn test_zipcode_ranking_excludes_empty_groups_and_caps() {
        let mut rows: Vec<GroupRow> = (0..12)
            .map(|i| group(vec![format!("z{:02}", i).into()], 10, 100.0, i, 0.0))
            .collect();
        rows.push(group(vec!["empty".into()], 0, 0.0, 0, 0.0));

        let AggregateValue::Zipcodes(rows) =
            shape_rows(&CatalogEntry::FraudByZipcode.definition(), rows)
        else {
            panic!("expected zipcodes");
        };
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].zipcode, "z11");
        assert!(rows.iter().all(|r| r.zipcode != "empty"));
        assert!(rows.windows(2).all(|w| w[0].fraud_rate >= w[1].fraud_rate));
    }

    #[test]
    fn test_age_distribution_sorted_numerically() {
        let rows = vec![
            group(vec!["10".into()], 1, 1.0, 0, 0.0),
            group(vec!["U".into()], 1, 1.0, 0, 0.0),
            group(vec!["9".into()], 1, 1.0, 0, 0.0),
        ];
        let AggregateValue::Ages(rows) =
            shape_rows(&CatalogEntry::AgeDistribution.definition(), rows)
        else {
            panic!("expected ages");
        };
        let ages: Vec<AgeValue> = rows.into_iter().map(|r| r.age).collect();
        assert_eq!(
            ages,
            vec![AgeValue::Years(9), AgeValue::Years(10), AgeValue::Raw("U".into())]
        );
    }

    #[test]
    fn test_category_trends_order_by_step_then_amount() {
        let rows = vec![
            group(vec!["a".into(), 2i64.into()], 1, 5.0, 0, 0.0),
            group(vec!["b".into(), 1i64.into()], 1, 1.0, 0, 0.0),
            group(vec!["c".into(), 1i64.into()], 1, 9.0, 0, 0.0),
        ];
        let AggregateValue::CategoryTrends(rows) =
            shape_rows(&CatalogEntry::CategoryTrends.definition(), rows)
        else {
            panic!("expected trends");
        };
        let order: Vec<(i64, &str)> = rows.iter().map(|r| (r.step, r.category.as_str())).collect();
        assert_eq!(order, vec![(1, "c"), (1, "b"), (2, "a")]);
    }

    #[test]
    fn test_segment_rows_include_category_only_for_behavior() {
        let seg = vec![group(vec!["3".into(), "F".into()], 4, 40.0, 1, 10.0)];
        let AggregateValue::Segments(rows) =
            shape_rows(&CatalogEntry::CustomerSegmentation.definition(), seg)
        else {
            panic!("expected segments");
        };
        assert_eq!(rows[0].category, None);
        assert_eq!(rows[0].avg_amount, Some(10.0));

        let behavior = vec![group(
            vec!["3".into(), "F".into(), "es_food".into()],
            1,
            5.0,
            0,
            0.0,
        )];
        let AggregateValue::Segments(rows) =
            shape_rows(&CatalogEntry::CustomerBehavior.definition(), behavior)
        else {
            panic!("expected segments");
        };
        assert_eq!(rows[0].category.as_deref(), Some("es_food"));
    }

    #[test]
    fn test_average_is_null_without_rows() {
        let def = CatalogEntry::AverageTransactionAmount.definition();
        assert_eq!(shape_rows(&def, vec![]), AggregateValue::Scalar(None));
        assert_eq!(
            shape_rows(&def, vec![group(vec![], 4, 100.0, 0, 0.0)]),
            AggregateValue::Scalar(Some(25.0))
        );
    }
}
