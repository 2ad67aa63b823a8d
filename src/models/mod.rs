//! 核心数据模型模块
//!
//! 交易记录、过滤条件以及聚合结果的行结构。

pub mod aggregate;
pub mod filter;
pub mod transaction;

pub use aggregate::*;
pub use filter::*;
pub use transaction::*;
