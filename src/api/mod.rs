//! API 模块
//!
//! 提供 REST API 支持。

pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod routes;

use crate::api::app_state::AppState;
use crate::security::middleware::{auth_middleware, security_headers_middleware};
use axum::Router;

pub fn create_router(app_state: AppState) -> Router {
    let mut api = Router::new().merge(routes::analytics_routes::create_analytics_router());

    if let Some(authenticator) = app_state.authenticator.clone() {
        api = api.route_layer(axum::middleware::from_fn_with_state(
            authenticator,
            auth_middleware,
        ));
    }

    Router::new()
        .nest("/api/v1", api)
        // Add security headers middleware to all routes
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .with_state(app_state)
}
