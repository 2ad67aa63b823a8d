//! 存储模块
//!
//! Record Store 抽象及其 SurrealDB、内存实现。

pub mod factory;
pub mod memory;
pub mod record_store;
#[cfg(feature = "surrealdb")]
pub mod surrealdb;

pub use factory::StorageFactory;
pub use memory::MemoryRecordStore;
pub use record_store::{Dimension, RecordStore};
