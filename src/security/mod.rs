//! Security Module
//!
//! Optional authentication gate for the analytics API plus security headers.

pub mod auth;
pub mod middleware;

pub use auth::{ApiKeyAuth, Authenticator, Claims, CombinedAuthenticator, Credentials, JwtAuth};
