//! 聚合层集成测试：内存存储 + 过滤构建 + 执行器

use findash::analytics::{AggregationExecutor, CatalogEntry, FilterParams, build_filter};
use findash::error::AppError;
use findash::models::aggregate::{AgeValue, AggregateValue};
use findash::models::filter::Filter;
use findash::models::transaction::TransactionRecord;
use findash::storage::{MemoryRecordStore, RecordStore};
use std::sync::Arc;
use std::time::Duration;

fn record(
    step: i64,
    age: &str,
    gender: &str,
    category: &str,
    merchant: &str,
    amount: f64,
    fraud: u8,
) -> TransactionRecord {
    TransactionRecord {
        step,
        customer: Some(format!("C{}", step)),
        age: age.to_string(),
        gender: gender.to_string(),
        zipcode_ori: "28007".to_string(),
        merchant: merchant.to_string(),
        zip_merchant: if fraud == 1 { "28009" } else { "28007" }.to_string(),
        category: category.to_string(),
        amount,
        fraud,
    }
}

fn dataset() -> Vec<TransactionRecord> {
    vec![
        record(1, "2", "F", "es_food", "M1", 12.5, 0),
        record(1, "3", "M", "es_transportation", "M2", 40.0, 0),
        record(2, "4", "F", "es_health", "M3", 310.0, 1),
        record(3, "U", "E", "es_food", "M1", 8.0, 0),
        record(4, "5", "M", "es_travel", "M4", 990.0, 1),
        record(5, "2", "F", "es_transportation", "M2", 22.0, 0),
    ]
}

fn executor(records: Vec<TransactionRecord>) -> AggregationExecutor {
    AggregationExecutor::new(
        Arc::new(MemoryRecordStore::new(records)),
        Duration::from_secs(5),
        4,
    )
}

fn params(start: Option<&str>, end: Option<&str>, category: Option<&str>, age: Option<&str>) -> FilterParams {
    FilterParams {
        start_date: start.map(String::from),
        end_date: end.map(String::from),
        category: category.map(String::from),
        merchant: None,
        age_range: age.map(String::from),
    }
}

#[tokio::test]
async fn test_uncapped_aggregates_account_for_every_matching_record() {
    let store = Arc::new(MemoryRecordStore::new(dataset()));
    let filter = build_filter(&params(Some("1"), Some("4"), None, None)).unwrap();
    let expected = store.count(&filter).await.unwrap();
    assert_eq!(expected, 5);

    let report = AggregationExecutor::new(store, Duration::from_secs(5), 4)
        .execute(&filter, &[])
        .await
        .unwrap();

    for entry in CatalogEntry::ALL {
        if entry.definition().cap.is_some() {
            continue;
        }
        let value = report.get(entry).unwrap();
        if let Some(count) = value.record_count() {
            assert_eq!(count, expected, "{} does not cover every record", entry);
        }
    }
}

#[tokio::test]
async fn test_fraud_rates_are_bounded_or_null() {
    let report = executor(dataset()).execute(&Filter::open(), &[]).await.unwrap();

    let mut rates = Vec::new();
    if let Some(AggregateValue::Categories(rows)) = report.get(CatalogEntry::TransactionsByCategory) {
        rates.extend(rows.iter().map(|r| r.fraud_rate));
    }
    if let Some(AggregateValue::Merchants(rows)) = report.get(CatalogEntry::MerchantTotals) {
        rates.extend(rows.iter().map(|r| r.fraud_rate));
    }
    if let Some(AggregateValue::Zipcodes(rows)) = report.get(CatalogEntry::FraudByZipcode) {
        rates.extend(rows.iter().map(|r| r.fraud_rate));
    }

    assert!(!rates.is_empty());
    for rate in rates.into_iter().flatten() {
        assert!((0.0..=1.0).contains(&rate));
    }
}

#[tokio::test]
async fn test_top_merchants_is_prefix_of_merchant_totals() {
    let records: Vec<TransactionRecord> = (0..8)
        .map(|i| {
            record(
                i,
                "3",
                "F",
                "es_food",
                &format!("M{}", i),
                10.0 * (i % 4 + 1) as f64,
                0,
            )
        })
        .collect();
    let report = executor(records)
        .execute(
            &Filter::open(),
            &[CatalogEntry::TopMerchants, CatalogEntry::MerchantTotals],
        )
        .await
        .unwrap();

    let (Some(AggregateValue::Merchants(top)), Some(AggregateValue::Merchants(all))) = (
        report.get(CatalogEntry::TopMerchants),
        report.get(CatalogEntry::MerchantTotals),
    ) else {
        panic!("merchant aggregates missing");
    };

    assert_eq!(top.len(), 5);
    assert_eq!(all.len(), 8);
    assert_eq!(top.as_slice(), &all[..5]);
    assert!(all.windows(2).all(|w| w[0].total_amount >= w[1].total_amount));
}

#[tokio::test]
async fn test_empty_selection_yields_empty_rows_and_null_average() {
    let filter = build_filter(&params(Some("100"), Some("200"), None, None)).unwrap();
    let report = executor(dataset()).execute(&filter, &[]).await.unwrap();

    assert_eq!(report.len(), CatalogEntry::ALL.len());
    for (name, value) in report.iter() {
        match value {
            AggregateValue::Scalar(avg) => assert_eq!(*avg, None, "{}", name),
            rows => assert_eq!(rows.len(), Some(0), "{}", name),
        }
    }

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["averageTransactionAmount"].is_null());
}

#[tokio::test]
async fn test_grocery_scenario() {
    let records = vec![
        record(1, "3", "F", "es_grocery", "M1", 50.0, 0),
        record(2, "3", "M", "es_grocery", "M2", 150.0, 1),
    ];
    let report = executor(records)
        .execute(&Filter::open(), &[CatalogEntry::TransactionsByCategory])
        .await
        .unwrap();

    let Some(AggregateValue::Categories(rows)) = report.get(CatalogEntry::TransactionsByCategory) else {
        panic!("transactionsByCategory missing");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category, "es_grocery");
    assert_eq!(rows[0].fraud_count, 1);
    assert_eq!(rows[0].total_count, 2);
    assert_eq!(rows[0].total_amount, 200.0);
    assert_eq!(rows[0].fraud_rate, Some(0.5));
}

#[tokio::test]
async fn test_category_filter_keeps_only_grocery_rows() {
    let records = vec![
        record(1, "3", "F", "es_grocery", "M1", 50.0, 0),
        record(2, "3", "M", "es_grocery", "M2", 150.0, 1),
        record(3, "3", "M", "es_travel", "M3", 900.0, 1),
    ];
    let filter = build_filter(&params(None, None, Some("es_grocery"), None)).unwrap();
    let report = executor(records)
        .execute(&filter, &[CatalogEntry::TransactionsByCategory])
        .await
        .unwrap();

    let Some(AggregateValue::Categories(rows)) = report.get(CatalogEntry::TransactionsByCategory) else {
        panic!("transactionsByCategory missing");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category, "es_grocery");
    assert_eq!(rows[0].total_count, 2);
}

#[tokio::test]
async fn test_age_range_compares_numerically() {
    let records = vec![
        record(1, "25", "F", "es_food", "M1", 10.0, 0),
        record(2, "35", "F", "es_food", "M1", 10.0, 0),
        record(3, "U", "F", "es_food", "M1", 10.0, 0),
    ];
    let filter = build_filter(&params(None, None, None, Some("20-30"))).unwrap();
    let report = executor(records)
        .execute(&filter, &[CatalogEntry::AgeDistribution])
        .await
        .unwrap();

    let Some(AggregateValue::Ages(rows)) = report.get(CatalogEntry::AgeDistribution) else {
        panic!("ageDistribution missing");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].age, AgeValue::Years(25));
    assert_eq!(rows[0].count, 1);
}

#[test]
fn test_start_without_end_is_invalid_range() {
    let err = build_filter(&params(Some("10"), None, None, None)).unwrap_err();
    assert!(matches!(err, AppError::InvalidRange(_)));
}

#[tokio::test]
async fn test_repeated_requests_serialize_identically() {
    let executor = executor(dataset());
    let filter = build_filter(&params(Some("1"), Some("4"), None, None)).unwrap();

    let first = serde_json::to_string(&executor.execute(&filter, &[]).await.unwrap()).unwrap();
    let second = serde_json::to_string(&executor.execute(&filter, &[]).await.unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_differently_formatted_ages_share_one_group() {
    let records: Vec<TransactionRecord> = ["25", "025", "025", " 25", " 25", " 25"]
        .iter()
        .enumerate()
        .map(|(i, age)| record(i as i64, age, if i % 2 == 0 { "F" } else { "M" }, "es_food", "M1", 10.0, 0))
        .collect();
    let executor = executor(records);
    let entries = [
        CatalogEntry::AgeDistribution,
        CatalogEntry::CustomerSegmentation,
        CatalogEntry::CustomerBehavior,
    ];

    let first = executor.execute(&Filter::open(), &entries).await.unwrap();
    let Some(AggregateValue::Ages(ages)) = first.get(CatalogEntry::AgeDistribution) else {
        panic!("ageDistribution missing");
    };
    assert_eq!(ages.len(), 1);
    assert_eq!(ages[0].age, AgeValue::Years(25));
    assert_eq!(ages[0].count, 6);
    let Some(AggregateValue::Segments(segments)) = first.get(CatalogEntry::CustomerSegmentation) else {
        panic!("customerSegmentation missing");
    };
    assert_eq!(segments.len(), 2);

    let expected = serde_json::to_string(&first).unwrap();
    for _ in 0..20 {
        let again = executor.execute(&Filter::open(), &entries).await.unwrap();
        assert_eq!(serde_json::to_string(&again).unwrap(), expected);
    }
}
