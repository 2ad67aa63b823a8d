//! Security Middleware Module
//!
//! Axum middleware for authentication and security headers.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::result::Result as StdResult;
use std::sync::Arc;

use crate::error::AppError;
use crate::security::auth::{Authenticator, Credentials};

/// Authentication middleware
///
/// Missing or invalid credentials short-circuit with 401 `{"error":"Unauthorized"}`.
/// Accepted claims are attached to the request extensions.
pub async fn auth_middleware(
    State(authenticator): State<Arc<dyn Authenticator>>,
    mut req: Request<Body>,
    next: Next,
) -> StdResult<Response, AppError> {
    let credentials = extract_credentials(&req);
    if credentials.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let claims = authenticator.authenticate(&credentials).await?;
    tracing::debug!(sub = %claims.sub, "Request authenticated");
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extract credentials from request headers
fn extract_credentials(req: &Request<Body>) -> Credentials {
    if let Some(auth) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        let credentials = Credentials::from_authorization_header(Some(auth));
        if !credentials.is_empty() {
            return credentials;
        }
    }

    if let Some(key) = req.headers().get("X-API-Key").and_then(|h| h.to_str().ok()) {
        return Credentials::new(Some(key.to_string()), None);
    }

    Credentials::default()
}

/// Security headers middleware
pub async fn security_headers_middleware(
    req: Request<Body>,
    next: Next,
) -> StdResult<Response, StatusCode> {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    Ok(response)
}
