//! FinDash - 金融交易分析服务
//!
//! 对只读的交易记录集按步长、类别、商户和年龄过滤，
//! 并发计算一组固定的聚合统计，以单个 JSON 对象返回给仪表盘。

pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod security;
pub mod storage;
