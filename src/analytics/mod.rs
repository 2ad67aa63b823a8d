//! 分析聚合层
//!
//! Filter Builder → Aggregation Catalog → Aggregation Executor。

pub mod catalog;
pub mod executor;
pub mod filter_builder;

pub use catalog::{CatalogEntry, parse_entries};
pub use executor::{AggregationExecutor, AnalyticsReport};
pub use filter_builder::{FilterParams, build_filter};
