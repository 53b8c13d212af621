//! Session management with JWT cookies issued after a validated login.

use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use launch_bridge_core::{
    ConfigError, IdentityError, IdentityResult, SessionAuthority, SessionGrant, VerifiedIdentity,
    derive_signing_key, validate_secret,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const SESSION_KEY_LABEL: &str = "launch-bridge/session/v1";

pub const DEFAULT_SESSION_COOKIE_NAME: &str = "lti_bridge_session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Session not found")]
    SessionNotFound,
}

impl From<SessionError> for IdentityError {
    fn from(err: SessionError) -> Self {
        IdentityError::SessionError(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub provider_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Opaque launch context carried forward from the launch
    pub launch_context: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            ttl: Duration::hours(8),
        }
    }
}

/// Stateless session issuer; everything needed to verify a session lives in
/// its cookie.
pub struct SessionService {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionService {
    pub fn new(secret: &str, config: SessionConfig) -> Result<Self, SessionError> {
        validate_secret(secret)?;
        if config.cookie_name.trim().is_empty() {
            return Err(ConfigError::Missing("session.cookie_name").into());
        }
        if config.ttl <= Duration::zero() {
            return Err(ConfigError::Invalid {
                field: "session.ttl_seconds",
                reason: "must be positive".to_string(),
            }
            .into());
        }

        let key = derive_signing_key(SESSION_KEY_LABEL, secret);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            config,
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            validation,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn issue(
        &self,
        identity: &VerifiedIdentity,
        launch_context: &str,
    ) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.subject.clone(),
            exp: (now + self.config.ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            provider_id: identity.provider_id.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            launch_context: launch_context.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        info!(subject = %claims.sub, "Issued session");
        Ok(token)
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Claims of the session cookie on a request, if it carries a valid one.
    pub fn claims(&self, headers: &HeaderMap) -> Result<SessionClaims, SessionError> {
        let jar = CookieJar::from_headers(headers);
        let cookie = jar
            .get(&self.config.cookie_name)
            .ok_or(SessionError::SessionNotFound)?;
        self.verify_session(cookie.value())
    }
}

impl SessionAuthority for SessionService {
    fn has_session(&self, headers: &HeaderMap) -> bool {
        match self.claims(headers) {
            Ok(_) => true,
            Err(SessionError::SessionNotFound) => false,
            Err(e) => {
                debug!("Ignoring unusable session cookie: {}", e);
                false
            }
        }
    }

    fn establish(
        &self,
        identity: &VerifiedIdentity,
        launch_context: &str,
    ) -> IdentityResult<SessionGrant> {
        let token = self.issue(identity, launch_context)?;

        Ok(SessionGrant {
            cookie_name: self.config.cookie_name.clone(),
            cookie_value: token,
            max_age_seconds: self.config.ttl.num_seconds().unsigned_abs(),
        })
    }
}
