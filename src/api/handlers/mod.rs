//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod analytics_handler;

pub use analytics_handler::*;
