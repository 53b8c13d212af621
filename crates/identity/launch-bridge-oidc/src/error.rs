//! Provider adapter error types.

use launch_bridge_core::{ConfigError, IdentityError};
use thiserror::Error;

pub type OidcResult<T> = Result<T, OidcError>;

#[derive(Debug, Error)]
pub enum OidcError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("State token TTL must be positive")]
    InvalidTtl,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Invalid identity token: {0}")]
    InvalidIdToken(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("User info request failed: {0}")]
    UserInfoFailed(String),

    #[error("Invalid user info response: {0}")]
    InvalidUserInfoResponse(String),
}

impl From<OidcError> for IdentityError {
    fn from(err: OidcError) -> Self {
        IdentityError::ProviderError(err.to_string())
    }
}
