use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use std::time::Instant;
use tracing::{debug, info};

use crate::{
    analytics::{
        catalog::{self, parse_entries},
        executor::AnalyticsReport,
        filter_builder::build_filter,
    },
    api::{app_state::AppState, dto::analytics_dto::*},
    error::AppError,
    security::auth::Claims,
};

/// 聚合接口
///
/// 两种取消方式：
/// - 客户端断开时 axum 丢弃该 future，进行中的只读聚合随之放弃，不产生响应；
/// - 服务关闭信号到达时放弃整批聚合并返回 499 `Cancelled`。
pub async fn get_financial_data(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Query(params): Query<FinancialDataQuery>,
) -> Result<Json<AnalyticsReport>, AppError> {
    let filter = build_filter(&params.filter)?;
    let entries = parse_entries(params.aggregates.as_deref())?;
    let timeout = params.timeout(state.executor.timeout())?;
    debug!(
        ?filter,
        aggregates = entries.len(),
        caller = claims.as_ref().map(|Extension(c)| c.sub.as_str()).unwrap_or("anonymous"),
        "Financial data request"
    );

    let start_time = Instant::now();
    let result = state
        .executor
        .execute_until(&filter, &entries, timeout, state.shutdown_requested())
        .await;
    let took_ms = start_time.elapsed().as_millis() as u64;

    match result {
        Ok(report) => {
            state.metrics.record_analytics(took_ms, report.len());
            Ok(Json(report))
        }
        Err(e) => {
            state.metrics.record_analytics_failure(&e);
            Err(e)
        }
    }
}

/// 交易分页列表
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<TransactionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = build_filter(&params.filter)?;
    let (page, limit) = params.paging(state.pages.default_size, state.pages.max_size)?;
    let start = (page - 1).saturating_mul(limit);

    let (data, total) = tokio::try_join!(
        state.store.list(&filter, start, limit),
        state.store.count(&filter),
    )
    .map_err(AppError::into_data_fetch)?;

    info!(page, limit, total, "Listed transactions");
    Ok(Json(TransactionPage::new(data, total, page, limit)))
}

/// 可用的目录项
pub async fn list_aggregates() -> impl IntoResponse {
    Json(catalog::describe())
}
