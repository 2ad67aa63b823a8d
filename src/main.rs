use anyhow::Context;
use axum::http::HeaderValue;
use findash::api::{self, app_state::AppState};
use findash::config::loader::ConfigLoader;
use findash::observability::{
    AppMetrics, ObservabilityState, create_observability_router, init_tracing, metrics_middleware,
};
use findash::storage::StorageFactory;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    ConfigLoader::validate(&config).context("Invalid configuration")?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing(&config.logging)?;
    info!(
        app = %config.app_name,
        environment = %config.environment,
        "Starting FinDash..."
    );

    let store = StorageFactory::create(&config.database).await?;
    match StorageFactory::health_check(store.as_ref()).await {
        Ok(true) => info!(backend = store.backend_name(), "Record store ready"),
        _ => warn!(backend = store.backend_name(), "Record store health check failed"),
    }

    let metrics = Arc::new(AppMetrics::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app_state = AppState::new(
        store.clone(),
        &config.analytics,
        &config.security,
        metrics.clone(),
    )
    .with_shutdown(shutdown_rx);
    if app_state.authenticator.is_none() {
        warn!("Authentication disabled; API is open");
    }

    let observability_state = ObservabilityState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        store,
        metrics.clone(),
    );

    let router = api::create_router(app_state)
        .merge(create_observability_router(observability_state))
        .layer(axum::middleware::from_fn_with_state(metrics, metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.security.cors_allowed_origins));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    info!("Server stopped");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Waits for ctrl-c, then cancels in-flight aggregation batches
async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.send_replace(true);
}
