//! 查询过滤条件
//!
//! 同一请求内的所有聚合共享同一个 `Filter`。

use serde::{Deserialize, Serialize};

use crate::models::transaction::TransactionRecord;

/// 时间桶闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    pub start: i64,
    pub end: i64,
}

impl StepRange {
    pub fn contains(&self, step: i64) -> bool {
        self.start <= step && step <= self.end
    }
}

/// 年龄闭区间（数值比较）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: i64,
    pub max: i64,
}

impl AgeRange {
    pub fn contains(&self, age: i64) -> bool {
        self.min <= age && age <= self.max
    }
}

/// 规范化后的过滤条件
///
/// 各字段为合取关系；缺省字段不施加约束，空过滤器匹配全部记录。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// 时间桶范围
    pub step: Option<StepRange>,
    /// 类别精确匹配
    pub category: Option<String>,
    /// 商户精确匹配
    pub merchant: Option<String>,
    /// 年龄范围
    pub age: Option<AgeRange>,
}

impl Filter {
    /// 不含任何约束的过滤器
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.step.is_none() && self.category.is_none() && self.merchant.is_none() && self.age.is_none()
    }

    pub fn with_steps(mut self, start: i64, end: i64) -> Self {
        self.step = Some(StepRange { start, end });
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn with_ages(mut self, min: i64, max: i64) -> Self {
        self.age = Some(AgeRange { min, max });
        self
    }

    /// 判断记录是否满足过滤条件
    ///
    /// 年龄先转为整数再比较；无法解析的年龄在设置了年龄范围时不匹配。
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(range) = &self.step {
            if !range.contains(record.step) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &record.category != category {
                return false;
            }
        }
        if let Some(merchant) = &self.merchant {
            if &record.merchant != merchant {
                return false;
            }
        }
        if let Some(range) = &self.age {
            match record.age_years() {
                Some(age) if range.contains(age) => {}
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step: i64, category: &str, age: &str) -> TransactionRecord {
        TransactionRecord {
            step,
            customer: None,
            age: age.to_string(),
            gender: "M".to_string(),
            zipcode_ori: "28007".to_string(),
            merchant: "M1".to_string(),
            zip_merchant: "28007".to_string(),
            category: category.to_string(),
            amount: 10.0,
            fraud: 0,
        }
    }

    #[test]
    fn test_open_filter_matches_everything() {
        let filter = Filter::open();
        assert!(filter.is_open());
        assert!(filter.matches(&record(0, "es_food", "U")));
        assert!(filter.matches(&record(179, "es_travel", "6")));
    }

    #[test]
    fn test_step_bounds_are_inclusive() {
        let filter = Filter::open().with_steps(5, 10);
        assert!(!filter.matches(&record(4, "es_food", "3")));
        assert!(filter.matches(&record(5, "es_food", "3")));
        assert!(filter.matches(&record(10, "es_food", "3")));
        assert!(!filter.matches(&record(11, "es_food", "3")));
    }

    #[test]
    fn test_age_range_uses_numeric_order() {
        // "9" < "10" numerically but not lexically
        let filter = Filter::open().with_ages(9, 10);
        assert!(filter.matches(&record(0, "es_food", "9")));
        assert!(filter.matches(&record(0, "es_food", "10")));
        assert!(!filter.matches(&record(0, "es_food", "100")));
    }

    #[test]
    fn test_unparseable_age_never_matches_age_range() {
        let filter = Filter::open().with_ages(0, 100);
        assert!(!filter.matches(&record(0, "es_food", "U")));
    }

    #[test]
    fn test_constraints_are_conjunctive() {
        let filter = Filter::open().with_category("es_food").with_steps(0, 3);
        assert!(filter.matches(&record(1, "es_food", "2")));
        assert!(!filter.matches(&record(1, "es_health", "2")));
        assert!(!filter.matches(&record(9, "es_food", "2")));
    }
}
