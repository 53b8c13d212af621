//! Immutable configuration values built once at startup.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

pub const DEFAULT_STATE_COOKIE_NAME: &str = "lti_oidc_state";
pub const DEFAULT_STATE_TTL_SECONDS: u64 = 600;
/// Upper bound on the state cookie lifetime; a login attempt is not a session.
pub const MAX_STATE_TTL_SECONDS: u64 = 86_400;
pub const DEFAULT_LAUNCH_PARAM: &str = "lti_state";
pub const MIN_SECRET_LEN: usize = 32;

/// Settings for the short-lived state cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateCookieConfig {
    pub name: String,
    pub ttl_seconds: u64,
    /// Always mark the cookie `Secure`, even on plain-http requests
    pub secure: bool,
    /// Track consumed attempts in process memory
    pub replay_ledger: bool,
}

impl Default for StateCookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_STATE_COOKIE_NAME.to_string(),
            ttl_seconds: DEFAULT_STATE_TTL_SECONDS,
            secure: true,
            replay_ledger: false,
        }
    }
}

/// Paths and parameter names the gate routes between
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub launch_param: String,
    pub callback_path: String,
    pub launch_required_path: String,
    pub error_path: String,
    pub post_login_path: String,
    pub logout_path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            launch_param: DEFAULT_LAUNCH_PARAM.to_string(),
            callback_path: "/auth/callback".to_string(),
            launch_required_path: "/lti-required".to_string(),
            error_path: "/auth-error".to_string(),
            post_login_path: "/".to_string(),
            logout_path: "/auth/logout".to_string(),
        }
    }
}

/// Bridge configuration shared by reference between all requests
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub signing_secret: String,
    pub state_cookie: StateCookieConfig,
    pub routes: RouteConfig,
}

impl BridgeConfig {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            state_cookie: StateCookieConfig::default(),
            routes: RouteConfig::default(),
        }
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_cookie.ttl_seconds = seconds;
        self
    }

    pub fn with_state_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.state_cookie.name = name.into();
        self
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.state_cookie.secure = secure;
        self
    }

    pub fn with_replay_ledger(mut self, enabled: bool) -> Self {
        self.state_cookie.replay_ledger = enabled;
        self
    }

    pub fn with_routes(mut self, routes: RouteConfig) -> Self {
        self.routes = routes;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_secret(&self.signing_secret)?;

        if self.state_cookie.name.trim().is_empty() {
            return Err(ConfigError::Missing("state_cookie.name"));
        }
        if self.state_cookie.ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "state_cookie.ttl_seconds",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.state_cookie.ttl_seconds > MAX_STATE_TTL_SECONDS {
            return Err(ConfigError::Invalid {
                field: "state_cookie.ttl_seconds",
                reason: format!("must not exceed {}", MAX_STATE_TTL_SECONDS),
            });
        }
        if self.routes.launch_param.trim().is_empty() {
            return Err(ConfigError::Missing("routes.launch_param"));
        }

        let paths = [
            ("routes.callback_path", &self.routes.callback_path),
            ("routes.launch_required_path", &self.routes.launch_required_path),
            ("routes.error_path", &self.routes.error_path),
            ("routes.post_login_path", &self.routes.post_login_path),
            ("routes.logout_path", &self.routes.logout_path),
        ];
        for (i, &(field, path)) in paths.iter().enumerate() {
            if !path.starts_with('/') || path.starts_with("//") {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("'{}' must be an absolute local path", path),
                });
            }
            if paths[..i].iter().any(|(_, other)| *other == path) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("'{}' is already used by another route", path),
                });
            }
        }

        Ok(())
    }
}

/// Checks an application secret is usable as signing material.
pub fn validate_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::Missing("signing_secret"));
    }
    if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid {
            field: "signing_secret",
            reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
        });
    }
    Ok(())
}

/// Which endpoint conventions a provider follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Logto,
    Auth0,
    #[default]
    Generic,
}

impl ProviderKind {
    fn default_authorize_path(&self) -> &'static str {
        match self {
            ProviderKind::Logto => "/oidc/auth",
            ProviderKind::Auth0 | ProviderKind::Generic => "/authorize",
        }
    }

    fn default_token_path(&self) -> &'static str {
        match self {
            ProviderKind::Logto => "/oidc/token",
            ProviderKind::Auth0 => "/oauth/token",
            ProviderKind::Generic => "/token",
        }
    }

    /// Generic issuers publish no conventional path; they must be explicit.
    fn default_end_session_path(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Logto => Some("/oidc/session/end"),
            ProviderKind::Auth0 => Some("/oidc/logout"),
            ProviderKind::Generic => None,
        }
    }

    fn default_userinfo_path(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Logto => Some("/oidc/me"),
            ProviderKind::Auth0 => Some("/userinfo"),
            ProviderKind::Generic => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Logto => write!(f, "logto"),
            ProviderKind::Auth0 => write!(f, "auth0"),
            ProviderKind::Generic => write!(f, "generic"),
        }
    }
}

/// OIDC provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub kind: ProviderKind,
    /// Issuer / tenant base URL, e.g. `https://tenant.logto.app`
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Connection hint forwarded to the provider
    pub connection: Option<String>,
    /// Organization hint forwarded to the provider
    pub organization: Option<String>,
    /// API audience (Auth0)
    pub audience: Option<String>,
    /// Overrides the kind's default authorize endpoint
    pub authorize_endpoint: Option<String>,
    /// Overrides the kind's default token endpoint
    pub token_endpoint: Option<String>,
    /// Overrides the kind's default RP-initiated logout endpoint
    pub end_session_endpoint: Option<String>,
    /// Where the provider sends the browser after logout; defaults to the
    /// launch-required page on the redirect URI's origin
    pub post_logout_redirect_uri: Option<String>,
    /// Overrides the kind's default userinfo endpoint
    pub userinfo_endpoint: Option<String>,
    /// Fetch userinfo with the access token after the code exchange
    pub fetch_userinfo: bool,
    /// Additional parameters to include in authorization request
    pub auth_params: HashMap<String, String>,
    pub http_timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_id: "oidc".to_string(),
            kind: ProviderKind::Generic,
            base_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
            ],
            connection: None,
            organization: None,
            audience: None,
            authorize_endpoint: None,
            token_endpoint: None,
            end_session_endpoint: None,
            post_logout_redirect_uri: None,
            userinfo_endpoint: None,
            fetch_userinfo: false,
            auth_params: HashMap::new(),
            http_timeout_seconds: 30,
        }
    }
}

impl ProviderConfig {
    pub fn authorize_url(&self) -> Result<Url, ConfigError> {
        self.endpoint(
            "provider.authorize_endpoint",
            self.authorize_endpoint.as_deref(),
            self.kind.default_authorize_path(),
        )
    }

    pub fn token_url(&self) -> Result<Url, ConfigError> {
        self.endpoint(
            "provider.token_endpoint",
            self.token_endpoint.as_deref(),
            self.kind.default_token_path(),
        )
    }

    /// RP-initiated logout endpoint, if the provider has one.
    pub fn end_session_url(&self) -> Result<Option<Url>, ConfigError> {
        self.optional_endpoint(
            "provider.end_session_endpoint",
            self.end_session_endpoint.as_deref(),
            self.kind.default_end_session_path(),
        )
    }

    pub fn userinfo_url(&self) -> Result<Option<Url>, ConfigError> {
        self.optional_endpoint(
            "provider.userinfo_endpoint",
            self.userinfo_endpoint.as_deref(),
            self.kind.default_userinfo_path(),
        )
    }

    /// Absolute URL the provider returns the browser to after logout.
    pub fn post_logout_url(&self, launch_required_path: &str) -> Result<Url, ConfigError> {
        let field = "provider.post_logout_redirect_uri";
        let url = match explicit_value(self.post_logout_redirect_uri.as_deref()) {
            Some(value) => Url::parse(value),
            None => Url::parse(self.redirect_uri.trim())
                .and_then(|redirect| redirect.join(launch_required_path)),
        }
        .map_err(|e| ConfigError::Invalid {
            field,
            reason: e.to_string(),
        })?;

        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("'{}' is not an absolute URL", url),
            });
        }
        Ok(url)
    }

    fn optional_endpoint(
        &self,
        field: &'static str,
        explicit: Option<&str>,
        default_path: Option<&str>,
    ) -> Result<Option<Url>, ConfigError> {
        match (explicit_value(explicit), default_path) {
            (None, None) => Ok(None),
            (explicit, default_path) => self
                .endpoint(field, explicit, default_path.unwrap_or_default())
                .map(Some),
        }
    }

    fn endpoint(
        &self,
        field: &'static str,
        explicit: Option<&str>,
        default_path: &str,
    ) -> Result<Url, ConfigError> {
        let raw = match explicit_value(explicit) {
            Some(value) => value.to_string(),
            None => format!("{}{}", self.base_url.trim().trim_end_matches('/'), default_path),
        };

        let url = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            field,
            reason: format!("'{}': {}", raw, e),
        })?;

        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("'{}' is not an absolute URL", raw),
            });
        }

        Ok(url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("provider.base_url"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("provider.client_id"));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(ConfigError::Missing("provider.redirect_uri"));
        }
        Url::parse(&self.redirect_uri).map_err(|e| ConfigError::Invalid {
            field: "provider.redirect_uri",
            reason: e.to_string(),
        })?;
        self.authorize_url()?;
        self.token_url()?;
        self.end_session_url()?;
        if self.fetch_userinfo && self.userinfo_url()?.is_none() {
            return Err(ConfigError::Missing("provider.userinfo_endpoint"));
        }
        Ok(())
    }
}

fn explicit_value(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
