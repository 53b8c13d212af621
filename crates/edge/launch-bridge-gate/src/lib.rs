//! Edge gate and callback endpoint for the LTI to OIDC launch bridge.
//!
//! [`edge_gate`] runs in front of protected routes. A request with a session
//! passes through; a request carrying a launch context starts a login attempt
//! by setting the signed state cookie and redirecting to the provider; anything
//! else is sent to the "launch required" page. [`callback_handler`] closes the
//! loop when the provider redirects back.
//!
//! ```rust,ignore
//! let gate = GateState::new(bridge_config, provider, sessions)?;
//!
//! let app = Router::new()
//!     .route("/", get(home))
//!     .layer(axum::middleware::from_fn_with_state(gate.clone(), edge_gate))
//!     .merge(callback_routes(gate));
//! ```

pub mod callback;
pub mod cookies;
pub mod decision;
pub mod middleware;

pub use callback::{callback_handler, callback_routes};
pub use decision::{GateDecision, decide};
pub use middleware::edge_gate;

use axum::response::Redirect;
use chrono::Duration;
use launch_bridge_core::{
    AuthFailure, BridgeConfig, ConfigError, OidcProvider, RouteConfig, SessionAuthority,
};
use launch_bridge_oidc::{CallbackValidator, InMemoryReplayLedger, StateTokenCodec};
use std::sync::Arc;
use tracing::info;

/// Everything the gate and the callback share, built once at startup.
#[derive(Clone)]
pub struct GateState {
    config: Arc<BridgeConfig>,
    codec: Arc<StateTokenCodec>,
    state_ttl: Duration,
    validator: CallbackValidator,
    provider: Arc<dyn OidcProvider>,
    sessions: Arc<dyn SessionAuthority>,
}

impl GateState {
    pub fn new(
        config: BridgeConfig,
        provider: Arc<dyn OidcProvider>,
        sessions: Arc<dyn SessionAuthority>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let codec = Arc::new(StateTokenCodec::new(&config.signing_secret)?);
        let state_ttl = i64::try_from(config.state_cookie.ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| ConfigError::Invalid {
                field: "state_cookie.ttl_seconds",
                reason: "out of range".to_string(),
            })?;

        let mut validator = CallbackValidator::new(codec.clone());
        if config.state_cookie.replay_ledger {
            info!("Replay ledger enabled for login attempts");
            validator = validator.with_ledger(Arc::new(InMemoryReplayLedger::new()));
        }

        Ok(Self {
            config: Arc::new(config),
            codec,
            state_ttl,
            validator,
            provider,
            sessions,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<dyn SessionAuthority> {
        &self.sessions
    }
}

/// Redirect to the error page with the generic message for `failure`.
pub fn failure_redirect(routes: &RouteConfig, failure: &AuthFailure) -> Redirect {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("message", failure.public_message())
        .finish();
    Redirect::to(&format!("{}?{}", routes.error_path, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_failure_redirect_carries_generic_message() {
        let routes = RouteConfig::default();

        let response = failure_redirect(&routes, &AuthFailure::CsrfMismatch).into_response();
        let location = response.headers()["location"].to_str().unwrap();
        assert_eq!(location, "/auth-error?message=Invalid+Login+State");

        let response =
            failure_redirect(&routes, &AuthFailure::ProviderError("boom".into())).into_response();
        let location = response.headers()["location"].to_str().unwrap();
        assert_eq!(location, "/auth-error?message=Login+Failed");
    }
}
