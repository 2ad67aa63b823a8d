//! SurrealDB Record Store
//!
//! 分组、计数、求和全部下推到 SurrealQL，聚合层只做派生字段与排序。

use async_trait::async_trait;
use serde_json::{Value, json};
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tracing::debug;

use crate::config::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::aggregate::{DimensionValue, GroupRow};
use crate::models::filter::Filter;
use crate::models::transaction::TransactionRecord;
use crate::storage::record_store::{Dimension, DimensionKind, RecordStore};

/// SurrealDB 连接池
#[derive(Clone)]
pub struct SurrealPool {
    /// 数据库连接
    db: Surreal<Any>,
    /// 连接配置
    config: DatabaseConfig,
}

impl SurrealPool {
    /// 创建新的连接池
    pub async fn new(config: DatabaseConfig) -> std::result::Result<Self, surrealdb::Error> {
        let db: Surreal<Any> = connect(&config.url).await?;

        // 认证
        db.signin(Root {
            username: &config.username,
            password: &config.password,
        })
        .await?;

        // 选择命名空间和数据库
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        Ok(Self { db, config })
    }

    /// 获取内部数据库实例
    pub fn inner(&self) -> Surreal<Any> {
        self.db.clone()
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

/// 去除首尾空白后的年龄文本
const AGE_TEXT: &str = "string::trim(<string> age)";

const RECORD_FIELDS: &str =
    "step, customer, age, gender, zipcodeOri, merchant, zipMerchant, category, amount, fraud";

/// 过滤条件转 WHERE 子句与绑定参数
///
/// 年龄字段去除首尾空白后必须全为数字，才转为整数比较。
pub fn where_clause(filter: &Filter) -> (String, Vec<(&'static str, Value)>) {
    let mut predicates: Vec<String> = Vec::new();
    let mut bindings = Vec::new();

    if let Some(range) = &filter.step {
        predicates.push("step >= $step_start AND step <= $step_end".to_string());
        bindings.push(("step_start", json!(range.start)));
        bindings.push(("step_end", json!(range.end)));
    }
    if let Some(category) = &filter.category {
        predicates.push("category = $category".to_string());
        bindings.push(("category", json!(category)));
    }
    if let Some(merchant) = &filter.merchant {
        predicates.push("merchant = $merchant".to_string());
        bindings.push(("merchant", json!(merchant)));
    }
    if let Some(range) = &filter.age {
        predicates.push(age_range_predicate());
        bindings.push(("age_min", json!(range.min)));
        bindings.push(("age_max", json!(range.max)));
    }

    if predicates.is_empty() {
        (String::new(), bindings)
    } else {
        (format!(" WHERE {}", predicates.join(" AND ")), bindings)
    }
}

fn age_range_predicate() -> String {
    format!(
        "string::is::numeric({age}) AND <int> {age} >= $age_min AND <int> {age} <= $age_max",
        age = AGE_TEXT
    )
}

/// 数字年龄按整数分组（"25"、"025"、" 25" 归为同一组），其余保留原文
fn age_projection() -> String {
    format!(
        "IF string::is::numeric({age}) THEN <int> {age} ELSE age END",
        age = AGE_TEXT
    )
}

fn projection(dimension: Dimension) -> String {
    match dimension {
        Dimension::AmountBin => "math::round(amount / 100)".to_string(),
        Dimension::Age => age_projection(),
        other => other.field().to_string(),
    }
}

/// 分组查询语句；维度以 k0..kn 为别名
pub fn group_query(filter: &Filter, dimensions: &[Dimension]) -> (String, Vec<(&'static str, Value)>) {
    let (where_sql, bindings) = where_clause(filter);
    let keys: Vec<String> = (0..dimensions.len()).map(|i| format!("k{}", i)).collect();

    let mut select: Vec<String> = dimensions
        .iter()
        .zip(&keys)
        .map(|(d, k)| format!("{} AS {}", projection(*d), k))
        .collect();
    select.push("count() AS count".to_string());
    select.push("math::sum(amount) AS total_amount".to_string());
    select.push("count(fraud = 1) AS fraud_count".to_string());
    select.push("math::sum(amount * fraud) AS fraud_amount".to_string());

    let group_by = if keys.is_empty() {
        "GROUP ALL".to_string()
    } else {
        format!("GROUP BY {}", keys.join(", "))
    };

    (
        format!(
            "SELECT {} FROM type::table($table){} {}",
            select.join(", "),
            where_sql,
            group_by
        ),
        bindings,
    )
}

fn key_value(dimension: Dimension, raw: Option<&Value>) -> Result<DimensionValue> {
    let raw = raw.unwrap_or(&Value::Null);
    match dimension.kind() {
        DimensionKind::Int => raw
            .as_i64()
            .or_else(|| raw.as_f64().map(|f| f.round() as i64))
            .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
            .map(DimensionValue::Int)
            .ok_or_else(|| {
                AppError::Database(format!("Unexpected value for {}: {}", dimension, raw))
            }),
        DimensionKind::Age => Ok(match raw {
            Value::Number(n) => match n.as_i64() {
                Some(years) => DimensionValue::Int(years),
                None => DimensionValue::Text(n.to_string()),
            },
            Value::String(s) => DimensionValue::Text(s.clone()),
            Value::Null => DimensionValue::Text(String::new()),
            other => DimensionValue::Text(other.to_string()),
        }),
        DimensionKind::Text => Ok(match raw {
            Value::String(s) => DimensionValue::Text(s.clone()),
            Value::Null => DimensionValue::Text(String::new()),
            other => DimensionValue::Text(other.to_string()),
        }),
    }
}

fn number(row: &Value, field: &str) -> f64 {
    row.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

/// SurrealQL 分组结果转 `GroupRow`
pub fn parse_group_row(row: &Value, dimensions: &[Dimension]) -> Result<GroupRow> {
    let key = dimensions
        .iter()
        .enumerate()
        .map(|(i, d)| key_value(*d, row.get(format!("k{}", i))))
        .collect::<Result<Vec<_>>>()?;

    Ok(GroupRow {
        key,
        count: number(row, "count") as u64,
        total_amount: number(row, "total_amount"),
        fraud_count: number(row, "fraud_count") as u64,
        fraud_amount: number(row, "fraud_amount"),
    })
}

/// 基于 SurrealDB 的记录存储
#[derive(Clone)]
pub struct SurrealRecordStore {
    pool: SurrealPool,
    table: String,
}

impl SurrealRecordStore {
    pub fn new(pool: SurrealPool) -> Self {
        let table = pool.config().table.clone();
        Self { pool, table }
    }

    async fn run(&self, sql: String, bindings: Vec<(&'static str, Value)>) -> Result<Vec<Value>> {
        let db = self.pool.inner();
        let mut query = db.query(sql).bind(("table", self.table.clone()));
        for binding in bindings {
            query = query.bind(binding);
        }
        let rows: Vec<Value> = query.await?.take(0)?;
        Ok(rows)
    }
}

#[async_trait]
impl RecordStore for SurrealRecordStore {
    async fn group(&self, filter: &Filter, dimensions: &[Dimension]) -> Result<Vec<GroupRow>> {
        let (sql, bindings) = group_query(filter, dimensions);
        debug!("SurrealQL group: {}", sql);

        let rows = self.run(sql, bindings).await?;
        rows.iter()
            .map(|row| parse_group_row(row, dimensions))
            .filter(|row| !matches!(row, Ok(r) if r.count == 0))
            .collect()
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let (where_sql, bindings) = where_clause(filter);
        let sql = format!(
            "SELECT count() AS count FROM type::table($table){} GROUP ALL",
            where_sql
        );
        let rows = self.run(sql, bindings).await?;
        Ok(rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    async fn list(
        &self,
        filter: &Filter,
        start: usize,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let (where_sql, mut bindings) = where_clause(filter);
        let sql = format!(
            "SELECT {} FROM type::table($table){} ORDER BY step ASC, merchant ASC LIMIT $limit START $start",
            RECORD_FIELDS, where_sql
        );
        bindings.push(("limit", json!(limit)));
        bindings.push(("start", json!(start)));

        self.run(sql, bindings)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(AppError::from))
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        let db = self.pool.inner();
        db.query("RETURN 1").await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "surrealdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_filter_has_no_where_clause() {
        let (sql, bindings) = where_clause(&Filter::open());
        assert!(sql.is_empty());
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_where_clause_binds_every_constraint() {
        let filter = Filter::open()
            .with_steps(1, 5)
            .with_category("es_food")
            .with_merchant("M1")
            .with_ages(20, 30);
        let (sql, bindings) = where_clause(&filter);

        assert!(sql.starts_with(" WHERE "));
        assert!(sql.contains("string::is::numeric(string::trim(<string> age))"));
        assert!(sql.contains("<int> string::trim(<string> age) >= $age_min"));
        let names: Vec<&str> = bindings.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            vec!["step_start", "step_end", "category", "merchant", "age_min", "age_max"]
        );
    }

    #[test]
    fn test_group_query_aliases_dimensions() {
        let (sql, _) = group_query(&Filter::open(), &[Dimension::AmountBin, Dimension::Fraud]);
        assert!(sql.contains("math::round(amount / 100) AS k0"));
        assert!(sql.contains("fraud AS k1"));
        assert!(sql.ends_with("GROUP BY k0, k1"));

        let (sql, _) = group_query(&Filter::open(), &[]);
        assert!(sql.ends_with("GROUP ALL"));
    }

    #[test]
    fn test_age_is_grouped_by_coerced_value() {
        let (sql, _) = group_query(&Filter::open(), &[Dimension::Age, Dimension::Gender]);
        assert!(sql.contains(
            "IF string::is::numeric(string::trim(<string> age)) THEN <int> string::trim(<string> age) ELSE age END AS k0"
        ));

        let numeric = parse_group_row(&json!({"k0": 25, "k1": "F", "count": 2}), &[Dimension::Age, Dimension::Gender])
            .unwrap();
        assert_eq!(numeric.key[0], DimensionValue::Int(25));
        let raw = parse_group_row(&json!({"k0": "U", "k1": "F", "count": 1}), &[Dimension::Age, Dimension::Gender])
            .unwrap();
        assert_eq!(raw.key[0], DimensionValue::from("U"));
    }

    #[test]
    fn test_parse_group_row_reads_keys_and_sums() {
        let row = json!({
            "k0": "es_food", "k1": 12, "count": 4,
            "total_amount": 100.5, "fraud_count": 1, "fraud_amount": 40.0
        });
        let parsed = parse_group_row(&row, &[Dimension::Category, Dimension::Step]).unwrap();
        assert_eq!(
            parsed.key,
            vec![DimensionValue::from("es_food"), DimensionValue::Int(12)]
        );
        assert_eq!(parsed.count, 4);
        assert_eq!(parsed.fraud_count, 1);
        assert_eq!(parsed.fraud_amount, 40.0);
    }

    #[test]
    fn test_parse_group_row_rejects_non_numeric_step() {
        let row = json!({ "k0": "abc", "count": 1 });
        assert!(parse_group_row(&row, &[Dimension::Step]).is_err());
    }
}
