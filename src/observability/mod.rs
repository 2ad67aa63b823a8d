//! 可观测性模块
//!
//! 提供 Prometheus 文本格式指标、结构化日志和健康检查。

use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt::writer::BoxMakeWriter};

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};
use crate::storage::record_store::RecordStore;

// ===== Metrics =====

/// 应用指标
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub http_requests_total: AtomicU64,
    pub http_request_duration_ms_sum: AtomicU64,
    pub http_errors_total: AtomicU64,
    pub analytics_requests_total: AtomicU64,
    pub analytics_latency_ms_sum: AtomicU64,
    pub aggregates_computed_total: AtomicU64,
    pub analytics_failures_total: AtomicU64,
    pub analytics_timeouts_total: AtomicU64,
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64, server_error: bool) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_duration_ms_sum
            .fetch_add(duration_ms, Ordering::Relaxed);
        if server_error {
            self.http_errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 记录一次成功的聚合批次
    pub fn record_analytics(&self, duration_ms: u64, aggregates: usize) {
        self.analytics_requests_total.fetch_add(1, Ordering::Relaxed);
        self.analytics_latency_ms_sum
            .fetch_add(duration_ms, Ordering::Relaxed);
        self.aggregates_computed_total
            .fetch_add(aggregates as u64, Ordering::Relaxed);
    }

    /// 记录失败的聚合批次
    pub fn record_analytics_failure(&self, err: &AppError) {
        self.analytics_requests_total.fetch_add(1, Ordering::Relaxed);
        match err {
            AppError::Timeout(_) => self.analytics_timeouts_total.fetch_add(1, Ordering::Relaxed),
            _ => self.analytics_failures_total.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        format!(
            r#"# HELP http_requests_total Total HTTP requests
# TYPE http_requests_total counter
http_requests_total {}
# HELP http_request_duration_seconds HTTP request duration in seconds
# TYPE http_request_duration_seconds summary
http_request_duration_seconds_sum {}
http_request_duration_seconds_count {}
# HELP http_errors_total HTTP responses with a 5xx status
# TYPE http_errors_total counter
http_errors_total {}
# HELP analytics_requests_total Aggregation batches executed
# TYPE analytics_requests_total counter
analytics_requests_total {}
# HELP analytics_latency_seconds Successful aggregation batch latency in seconds
# TYPE analytics_latency_seconds summary
analytics_latency_seconds_sum {}
# HELP aggregates_computed_total Catalog entries computed
# TYPE aggregates_computed_total counter
aggregates_computed_total {}
# HELP analytics_failures_total Aggregation batches that failed
# TYPE analytics_failures_total counter
analytics_failures_total {}
# HELP analytics_timeouts_total Aggregation batches that timed out
# TYPE analytics_timeouts_total counter
analytics_timeouts_total {}
"#,
            load(&self.http_requests_total),
            load(&self.http_request_duration_ms_sum) as f64 / 1000.0,
            load(&self.http_requests_total),
            load(&self.http_errors_total),
            load(&self.analytics_requests_total),
            load(&self.analytics_latency_ms_sum) as f64 / 1000.0,
            load(&self.aggregates_computed_total),
            load(&self.analytics_failures_total),
            load(&self.analytics_timeouts_total),
        )
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
    pub latency_ms: Option<u64>,
    pub checked_at: DateTime<Utc>,
}

/// 可观测性状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub store: Arc<dyn RecordStore>,
    pub last_checks: Arc<Mutex<Vec<HealthCheck>>>,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: String, store: Arc<dyn RecordStore>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            metrics,
            store,
            last_checks: Arc::new(Mutex::new(Vec::new())),
            start_time: Utc::now(),
            version,
        }
    }

    /// 检查存储连通性并保留最近 10 次结果
    pub async fn check_store(&self) -> HealthCheck {
        let started = std::time::Instant::now();
        let result = self.store.ping().await;
        let check = HealthCheck {
            name: format!("record_store:{}", self.store.backend_name()),
            status: if result.is_ok() { "healthy" } else { "unhealthy" }.to_string(),
            message: result.err().map(|e| e.to_string()),
            latency_ms: Some(started.elapsed().as_millis() as u64),
            checked_at: Utc::now(),
        };

        let mut checks = self.last_checks.lock().await;
        checks.push(check.clone());
        if checks.len() > 10 {
            checks.remove(0);
        }
        check
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// 获取完整健康状态
pub async fn health_check(State(state): State<ObservabilityState>) -> impl IntoResponse {
    let check = state.check_store().await;
    let healthy = check.status == "healthy";

    let health_status = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        checks: vec![check],
    };

    let status_code = if healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// 就绪检查（检查记录存储）
pub async fn readiness(State(state): State<ObservabilityState>) -> impl IntoResponse {
    if state.check_store().await.status == "healthy" {
        (axum::http::StatusCode::OK, "Ready")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}

/// Prometheus 指标端点
pub async fn metrics(State(state): State<ObservabilityState>) -> impl IntoResponse {
    (axum::http::StatusCode::OK, state.metrics.gather())
}

/// 版本信息端点
pub async fn version(State(state): State<ObservabilityState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: ObservabilityState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的级别；设置 `log_dir` 时按天滚动写入文件，
/// 返回的 guard 必须在进程生命周期内保持存活。
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = if config.level.is_empty() { "info" } else { config.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "findash.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_target(true)
        .with_line_number(true);

    let installed = if config.structured {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| AppError::Internal(format!("Failed to set tracing subscriber: {}", e)))?;

    Ok(guard)
}

// ===== Request Metrics Middleware =====

/// 记录请求指标的中间件
pub async fn metrics_middleware(
    State(metrics): State<Arc<AppMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let start = std::time::Instant::now();
    let response = next.run(req).await;

    metrics.record_http_request(
        start.elapsed().as_millis() as u64,
        response.status().is_server_error(),
    );
    response
}
