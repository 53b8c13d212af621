//! Core traits and types for the LTI to OIDC launch bridge.
//!
//! The bridge protects the handshake between an external launch (carrying an
//! opaque launch context) and an OIDC authorization-code login. This crate
//! holds what every other crate agrees on: the failure taxonomy, the immutable
//! configuration values, and the capability interfaces that provider adapters
//! and the session collaborator implement.

mod config;
mod error;

pub use config::{
    BridgeConfig, DEFAULT_LAUNCH_PARAM, DEFAULT_STATE_COOKIE_NAME, DEFAULT_STATE_TTL_SECONDS,
    MAX_STATE_TTL_SECONDS, MIN_SECRET_LEN, ProviderConfig, ProviderKind, RouteConfig, StateCookieConfig,
    validate_secret,
};
pub use error::{AuthFailure, ConfigError, IdentityError, IdentityResult};

use async_trait::async_trait;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Derive a 32-byte signing key for one purpose from the application secret.
///
/// Distinct labels keep the state-cookie key and the session key apart even
/// though both come from the same configured secret.
pub fn derive_signing_key(label: &str, secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    hasher.update([0u8]);
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifiedIdentity {
    pub provider_id: String,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Outcome of a successful authorization code exchange
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub identity: VerifiedIdentity,
    /// Nonce echoed inside the identity token, if any
    pub nonce: Option<String>,
    pub access_token: String,
    pub id_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Minimal capability interface every identity provider adapter implements.
///
/// The bridge never inspects identity tokens itself; it only asks the adapter
/// where to send the browser and what the code was worth.
#[async_trait]
pub trait OidcProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Authorization endpoint URL carrying `state` and, when given, `nonce`.
    fn build_authorize_url(&self, state: &str, nonce: Option<&str>) -> Url;

    /// Exchange an authorization code for a provider session.
    async fn exchange_code(&self, code: &str) -> IdentityResult<ProviderSession>;

    /// Logout endpoint URL that ends the provider session and returns the
    /// browser to `post_logout_redirect_uri`, or `None` when the provider
    /// offers no RP-initiated logout.
    fn end_session_url(&self, post_logout_redirect_uri: &Url) -> Option<Url> {
        let _ = post_logout_redirect_uri;
        None
    }
}

/// A cookie the session collaborator wants set on the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub cookie_name: String,
    pub cookie_value: String,
    pub max_age_seconds: u64,
}

/// Owner of post-login session material.
pub trait SessionAuthority: Send + Sync {
    /// Whether the request already carries a usable session.
    fn has_session(&self, headers: &HeaderMap) -> bool;

    /// Establish a session for a validated login, carrying the launch context forward.
    fn establish(
        &self,
        identity: &VerifiedIdentity,
        launch_context: &str,
    ) -> IdentityResult<SessionGrant>;
}
