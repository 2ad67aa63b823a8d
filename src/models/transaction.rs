use serde::{Deserialize, Serialize};

/// 交易记录
///
/// 记录存储中的一条金融交易，对本服务只读。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// 时间桶序号
    pub step: i64,

    /// 客户标识
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,

    /// 年龄（源数据以字符串存储）
    pub age: String,

    /// 性别
    pub gender: String,

    /// 客户邮编
    pub zipcode_ori: String,

    /// 商户
    pub merchant: String,

    /// 商户邮编
    pub zip_merchant: String,

    /// 交易类别
    pub category: String,

    /// 交易金额（非负）
    pub amount: f64,

    /// 欺诈标记，0 或 1
    pub fraud: u8,
}

impl TransactionRecord {
    /// 数值化的年龄；无法解析时返回 None
    pub fn age_years(&self) -> Option<i64> {
        parse_age(&self.age)
    }

    pub fn is_fraud(&self) -> bool {
        self.fraud != 0
    }

    /// 金额分箱：round(amount / 100)
    pub fn amount_bin(&self) -> i64 {
        amount_bin(self.amount)
    }
}

/// 年龄字符串转整数
///
/// 允许首尾空白，其余必须全部为 ASCII 数字（不接受符号），
/// 与 SurrealQL 中 `string::is::numeric(string::trim(..))` 的判定一致。
pub fn parse_age(raw: &str) -> Option<i64> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok()
}

pub fn amount_bin(amount: f64) -> i64 {
    (amount / 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(age: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            step: 0,
            customer: None,
            age: age.to_string(),
            gender: "F".to_string(),
            zipcode_ori: "28007".to_string(),
            merchant: "M1".to_string(),
            zip_merchant: "28007".to_string(),
            category: "es_food".to_string(),
            amount,
            fraud: 0,
        }
    }

    #[test]
    fn test_age_is_coerced_numerically() {
        assert_eq!(record("9", 1.0).age_years(), Some(9));
        assert_eq!(record(" 42 ", 1.0).age_years(), Some(42));
        assert_eq!(record("U", 1.0).age_years(), None);
        assert_eq!(record("025", 1.0).age_years(), Some(25));
        assert_eq!(record("+25", 1.0).age_years(), None);
        assert_eq!(record("-3", 1.0).age_years(), None);
        assert_eq!(record("", 1.0).age_years(), None);
    }

    #[test]
    fn test_amount_bin_rounds_to_nearest_hundred() {
        assert_eq!(record("30", 49.99).amount_bin(), 0);
        assert_eq!(record("30", 150.0).amount_bin(), 2);
        assert_eq!(record("30", 1234.0).amount_bin(), 12);
    }

    #[test]
    fn test_deserialize_camel_case_document() {
        let json = r#"{
            "step": 3, "customer": "C1093826151", "age": "4", "gender": "M",
            "zipcodeOri": "28007", "merchant": "M348934600", "zipMerchant": "28007",
            "category": "es_transportation", "amount": 4.55, "fraud": 0
        }"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.step, 3);
        assert_eq!(record.zipcode_ori, "28007");
        assert_eq!(record.customer.as_deref(), Some("C1093826151"));
        assert!(!record.is_fraud());
    }
}
