//! Router assembly.

use crate::pages::{self, PageState};
use crate::settings::Settings;
use anyhow::{Context, Result};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use launch_bridge_core::{OidcProvider, RouteConfig};
use launch_bridge_gate::{GateState, callback_routes, edge_gate};
use launch_bridge_oidc::OidcClient;
use launch_bridge_session::SessionService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const HEALTH_PATH: &str = "/health";

/// Build the application router from validated settings.
///
/// Protected pages sit behind the edge gate; the callback, logout, error and
/// launch-required routes stay outside it.
pub fn build_app(settings: &Settings) -> Result<Router> {
    let provider: Arc<dyn OidcProvider> =
        Arc::new(OidcClient::new(settings.provider.clone()).context("Failed to set up provider")?);
    let sessions = Arc::new(
        SessionService::new(&settings.security.signing_secret, settings.session_config()?)
            .context("Failed to set up sessions")?,
    );
    let gate = GateState::new(settings.bridge_config(), provider.clone(), sessions.clone())
        .context("Failed to set up edge gate")?;

    let routes = settings.routes.clone();
    check_reserved_paths(&routes)?;
    let post_logout_url = settings
        .provider
        .post_logout_url(&routes.launch_required_path)
        .context("Invalid post-logout redirect")?;

    let page_state = PageState {
        sessions,
        provider,
        post_logout_url,
        routes: routes.clone(),
        state_cookie_name: settings.state_cookie.name.clone(),
        cookie_secure: settings.security.cookie_secure,
    };

    let mut protected = Router::new().route("/", get(pages::protected));
    if routes.post_login_path != "/" {
        protected = protected.route(&routes.post_login_path, get(pages::protected));
    }
    let protected = protected
        .with_state(page_state.clone())
        .layer(from_fn_with_state(gate.clone(), edge_gate));

    let public = Router::new()
        .route(&routes.launch_required_path, get(pages::launch_required))
        .route(&routes.error_path, get(pages::auth_error))
        .route(&routes.logout_path, get(pages::logout))
        .route(HEALTH_PATH, get(|| async { "OK" }))
        .with_state(page_state);

    Ok(Router::new()
        .merge(protected)
        .merge(public)
        .merge(callback_routes(gate))
        .layer(TraceLayer::new_for_http()))
}

/// `/` always serves the protected page and `/health` the probe; public routes
/// and the post-login target may not shadow them.
fn check_reserved_paths(routes: &RouteConfig) -> Result<()> {
    let public = [
        ("routes.launch_required_path", &routes.launch_required_path),
        ("routes.error_path", &routes.error_path),
        ("routes.logout_path", &routes.logout_path),
        ("routes.callback_path", &routes.callback_path),
    ];
    for (field, path) in public {
        if path == "/" || path == HEALTH_PATH {
            anyhow::bail!("{field} '{path}' is reserved");
        }
    }
    if routes.post_login_path == HEALTH_PATH {
        anyhow::bail!("routes.post_login_path '{HEALTH_PATH}' is reserved");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_paths() {
        assert!(check_reserved_paths(&RouteConfig::default()).is_ok());

        let routes = RouteConfig {
            post_login_path: "/health".to_string(),
            ..RouteConfig::default()
        };
        assert!(check_reserved_paths(&routes).is_err());

        let routes = RouteConfig {
            post_login_path: "/home".to_string(),
            launch_required_path: "/".to_string(),
            ..RouteConfig::default()
        };
        assert!(check_reserved_paths(&routes).is_err());

        let routes = RouteConfig {
            error_path: "/health".to_string(),
            ..RouteConfig::default()
        };
        assert!(check_reserved_paths(&routes).is_err());
    }
}
