//! Authentication Module
//!
//! Gates the analytics API when `security.auth_enabled` is set:
//! - API Key authentication (`X-API-Key` or `Authorization: ApiKey <key>`)
//! - JWT (HS256 bearer token) authentication

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::config::SecurityConfig;
use crate::error::{AppError, Result};

/// Credentials for authentication
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    /// API key (if provided)
    pub api_key: Option<String>,
    /// JWT token (if provided)
    pub jwt_token: Option<String>,
}

impl Credentials {
    /// Create new credentials
    pub fn new(api_key: Option<String>, jwt_token: Option<String>) -> Self {
        Self { api_key, jwt_token }
    }

    /// Try to extract credentials from Authorization header
    pub fn from_authorization_header(auth_header: Option<&str>) -> Self {
        match auth_header {
            Some(header) if header.starts_with("ApiKey ") => {
                Self::new(Some(header[7..].trim().to_string()), None)
            }
            Some(header) if header.starts_with("Bearer ") => {
                Self::new(None, Some(header[7..].trim().to_string()))
            }
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.jwt_token.is_none()
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user ID or API key label)
    pub sub: String,
    /// User role
    pub role: String,
    /// Token expiration timestamp
    pub exp: usize,
    /// Issued at timestamp
    pub iat: usize,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    /// Create new claims
    pub fn new(sub: String, role: String, expiry_seconds: u64, issuer: String, audience: String) -> Self {
        let iat = Utc::now().timestamp() as usize;
        Self {
            sub,
            role,
            exp: iat + expiry_seconds as usize,
            iat,
            iss: issuer,
            aud: audience,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Authentication trait for different authentication methods
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate credentials and return the caller's claims
    async fn authenticate(&self, credentials: &Credentials) -> Result<Claims>;
    /// Get the authenticator type
    fn authenticator_type(&self) -> &'static str;
}

/// API Key based authentication
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    valid_keys: HashSet<String>,
}

impl ApiKeyAuth {
    pub fn new(api_keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            valid_keys: api_keys.into_iter().filter(|k| !k.is_empty()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.valid_keys.is_empty()
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuth {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Claims> {
        let api_key = credentials.api_key.as_ref().ok_or(AppError::Unauthorized)?;

        if !self.valid_keys.contains(api_key) {
            return Err(AppError::Unauthorized);
        }

        // API keys do not expire
        Ok(Claims {
            exp: usize::MAX,
            ..Claims::new(
                "api-key".to_string(),
                "viewer".to_string(),
                0,
                "findash".to_string(),
                "findash-api".to_string(),
            )
        })
    }

    fn authenticator_type(&self) -> &'static str {
        "ApiKey"
    }
}

/// JWT based authentication
#[derive(Clone)]
pub struct JwtAuth {
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl JwtAuth {
    pub fn new(secret: &str, issuer: String, audience: String) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.clone()]);
        validation.set_audience(&[self.audience.clone()]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT rejected: {}", e);
                AppError::Unauthorized
            })
    }
}

#[async_trait]
impl Authenticator for JwtAuth {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Claims> {
        let token = credentials.jwt_token.as_ref().ok_or(AppError::Unauthorized)?;
        self.validate_token(token)
    }

    fn authenticator_type(&self) -> &'static str {
        "JWT"
    }
}

/// Combined authenticator that tries API key first, then JWT
#[derive(Debug, Clone)]
pub struct CombinedAuthenticator {
    api_key_auth: Option<ApiKeyAuth>,
    jwt_auth: Option<JwtAuth>,
}

impl CombinedAuthenticator {
    pub fn new(api_key_auth: Option<ApiKeyAuth>, jwt_auth: Option<JwtAuth>) -> Self {
        Self {
            api_key_auth,
            jwt_auth,
        }
    }

    /// Create from security settings
    pub fn from_config(config: &SecurityConfig) -> Self {
        let api_key_auth = Some(ApiKeyAuth::new(config.api_keys.iter().cloned()))
            .filter(|auth| !auth.is_empty());

        let jwt_auth = (!config.jwt_secret.is_empty()).then(|| {
            JwtAuth::new(
                &config.jwt_secret,
                config.jwt_issuer.clone(),
                config.jwt_audience.clone(),
            )
        });

        Self::new(api_key_auth, jwt_auth)
    }
}

#[async_trait]
impl Authenticator for CombinedAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Claims> {
        if let (Some(auth), Some(_)) = (&self.api_key_auth, &credentials.api_key) {
            return auth.authenticate(credentials).await;
        }
        if let (Some(auth), Some(_)) = (&self.jwt_auth, &credentials.jwt_token) {
            return auth.authenticate(credentials).await;
        }
        Err(AppError::Unauthorized)
    }

    fn authenticator_type(&self) -> &'static str {
        "Combined"
    }
}
