//! Analytics Routes
//!
//! 定义聚合与交易列表相关的 API 路由。

use crate::api::handlers::analytics_handler::*;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

/// 创建分析路由器
pub fn create_analytics_router() -> Router<AppState> {
    Router::new()
        .route("/financial-data", get(get_financial_data))
        .route("/transactions", get(list_transactions))
        .route("/aggregates", get(list_aggregates))
}
