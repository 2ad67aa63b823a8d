use crate::analytics::executor::AggregationExecutor;
use crate::config::config::{AnalyticsConfig, SecurityConfig};
use crate::observability::AppMetrics;
use crate::security::auth::{Authenticator, CombinedAuthenticator};
use crate::storage::record_store::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// 分页设置
#[derive(Debug, Clone, Copy)]
pub struct PageSettings {
    pub default_size: usize,
    pub max_size: usize,
}

/// Application state shared by every request handler
///
/// The record store handle is acquired once at startup and borrowed per request.
#[derive(Clone)]
pub struct AppState {
    /// Record store shared with the executor
    pub store: Arc<dyn RecordStore>,
    /// Aggregation executor
    pub executor: Arc<AggregationExecutor>,
    /// Request and aggregation counters
    pub metrics: Arc<AppMetrics>,
    /// Authenticator; `None` leaves the API open
    pub authenticator: Option<Arc<dyn Authenticator>>,
    /// Transaction listing page sizes
    pub pages: PageSettings,
    /// Flips to `true` when the server starts shutting down
    pub shutdown: watch::Receiver<bool>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store.backend_name())
            .field("executor", &self.executor)
            .field("authenticator", &self.authenticator.as_ref().map(|a| a.authenticator_type()))
            .field("pages", &self.pages)
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        store: Arc<dyn RecordStore>,
        analytics: &AnalyticsConfig,
        security: &SecurityConfig,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        let executor = AggregationExecutor::new(
            store.clone(),
            Duration::from_millis(analytics.timeout_ms),
            analytics.max_concurrency,
        );

        let authenticator: Option<Arc<dyn Authenticator>> = security
            .auth_enabled
            .then(|| Arc::new(CombinedAuthenticator::from_config(security)) as Arc<dyn Authenticator>);

        // Sender dropped: never signals until `with_shutdown` installs a live one
        let (_, shutdown) = watch::channel(false);

        Self {
            store,
            executor: Arc::new(executor),
            metrics,
            authenticator,
            pages: PageSettings {
                default_size: analytics.default_page_size.max(1),
                max_size: analytics.max_page_size.max(1),
            },
            shutdown,
        }
    }

    /// Cancel in-flight aggregation batches when `shutdown` turns `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Resolves once shutdown has been signalled; pends forever without a live sender
    pub async fn shutdown_requested(&self) {
        let mut shutdown = self.shutdown.clone();
        if shutdown.wait_for(|stopping| *stopping).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Open (unauthenticated) state with development analytics settings
    pub fn development(store: Arc<dyn RecordStore>) -> Self {
        let config = crate::config::config::AppConfig::development();
        Self::new(
            store,
            &config.analytics,
            &config.security,
            Arc::new(AppMetrics::default()),
        )
    }
}
