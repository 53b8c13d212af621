//! Outbound authorization request construction.

use launch_bridge_core::{ConfigError, ProviderConfig};
use tracing::warn;
use url::Url;

/// Query parameters the builder owns; provider extras may not override them.
const RESERVED_PARAMS: &[&str] = &[
    "response_type",
    "client_id",
    "redirect_uri",
    "scope",
    "state",
    "nonce",
];

/// Builds redirect URLs to a provider's authorization endpoint.
///
/// All validation happens in [`AuthorizationRequestBuilder::new`], so `build`
/// is a pure, infallible function of the encoded state and nonce.
#[derive(Debug, Clone)]
pub struct AuthorizationRequestBuilder {
    endpoint: Url,
    client_id: String,
    redirect_uri: String,
    scope: String,
    hints: Vec<(String, String)>,
}

impl AuthorizationRequestBuilder {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let endpoint = config.authorize_url()?;

        let mut hints = Vec::new();
        for (key, value) in [
            ("connection", &config.connection),
            ("organization", &config.organization),
            ("audience", &config.audience),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                hints.push((key.to_string(), value.to_string()));
            }
        }

        let mut extras: Vec<(String, String)> = config
            .auth_params
            .iter()
            .filter(|(key, _)| {
                let reserved = RESERVED_PARAMS.contains(&key.as_str());
                if reserved {
                    warn!("Ignoring reserved authorization parameter '{}'", key);
                }
                !reserved
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        extras.sort();
        hints.extend(extras);

        Ok(Self {
            endpoint,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scopes.join(" "),
            hints,
        })
    }

    pub fn build(&self, state: &str, nonce: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.client_id);
            params.append_pair("redirect_uri", &self.redirect_uri);
            if !self.scope.is_empty() {
                params.append_pair("scope", &self.scope);
            }
            params.append_pair("state", state);

            if let Some(nonce) = nonce {
                params.append_pair("nonce", nonce);
            }

            for (key, value) in &self.hints {
                params.append_pair(key, value);
            }
        }

        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launch_bridge_core::ProviderKind;
    use std::collections::HashMap;

    fn logto_config() -> ProviderConfig {
        ProviderConfig {
            provider_id: "logto".to_string(),
            kind: ProviderKind::Logto,
            base_url: "https://tenant.logto.app/".to_string(),
            client_id: "logto_client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3001/auth/callback".to_string(),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_authorization_url_generation() {
        let builder = AuthorizationRequestBuilder::new(&logto_config()).unwrap();
        let url = builder.build("encoded-state", Some("nonce123"));

        assert_eq!(url.host_str(), Some("tenant.logto.app"));
        assert_eq!(url.path(), "/oidc/auth");

        let params: HashMap<_, _> = url.query_pairs().collect();
        assert_eq!(params.get("response_type"), Some(&"code".into()));
        assert_eq!(params.get("client_id"), Some(&"logto_client".into()));
        assert_eq!(
            params.get("redirect_uri"),
            Some(&"http://localhost:3001/auth/callback".into())
        );
        assert_eq!(params.get("scope"), Some(&"openid profile email".into()));
        assert_eq!(params.get("state"), Some(&"encoded-state".into()));
        assert_eq!(params.get("nonce"), Some(&"nonce123".into()));
    }

    #[test]
    fn test_nonce_is_optional() {
        let builder = AuthorizationRequestBuilder::new(&logto_config()).unwrap();
        let url = builder.build("s", None);
        assert!(!url.query_pairs().any(|(k, _)| k == "nonce"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut config = logto_config();
        config.auth_params.insert("prompt".to_string(), "login".to_string());
        config.auth_params.insert("ui_locales".to_string(), "en".to_string());
        config.auth_params.insert("max_age".to_string(), "0".to_string());
        let builder = AuthorizationRequestBuilder::new(&config).unwrap();

        assert_eq!(builder.build("s", Some("n")), builder.build("s", Some("n")));
    }

    #[test]
    fn test_hints_and_audience() {
        let mut config = logto_config();
        config.kind = ProviderKind::Auth0;
        config.connection = Some("google-oauth2".to_string());
        config.organization = Some("org_123".to_string());
        config.audience = Some("https://api.example.com".to_string());
        config.auth_params.insert("prompt".to_string(), "login".to_string());

        let url = AuthorizationRequestBuilder::new(&config)
            .unwrap()
            .build("s", None);
        let params: HashMap<_, _> = url.query_pairs().collect();

        assert_eq!(url.path(), "/authorize");
        assert_eq!(params.get("connection"), Some(&"google-oauth2".into()));
        assert_eq!(params.get("organization"), Some(&"org_123".into()));
        assert_eq!(params.get("audience"), Some(&"https://api.example.com".into()));
        assert_eq!(params.get("prompt"), Some(&"login".into()));
    }

    #[test]
    fn test_reserved_extras_cannot_override_state() {
        let mut config = logto_config();
        config
            .auth_params
            .insert("state".to_string(), "attacker".to_string());

        let url = AuthorizationRequestBuilder::new(&config)
            .unwrap()
            .build("real-state", None);
        let states: Vec<_> = url
            .query_pairs()
            .filter(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .collect();

        assert_eq!(states, vec!["real-state".to_string()]);
    }

    #[test]
    fn test_missing_identifiers_fail_at_construction() {
        let mut config = logto_config();
        config.base_url = String::new();
        assert_eq!(
            AuthorizationRequestBuilder::new(&config).unwrap_err(),
            ConfigError::Missing("provider.base_url")
        );

        let mut config = logto_config();
        config.client_id = String::new();
        assert_eq!(
            AuthorizationRequestBuilder::new(&config).unwrap_err(),
            ConfigError::Missing("provider.client_id")
        );
    }
}
