//! Minimal HTML pages served around the gate.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use launch_bridge_core::{OidcProvider, RouteConfig};
use launch_bridge_gate::cookies::{clear_cookie, request_is_https};
use launch_bridge_session::SessionService;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Clone)]
pub struct PageState {
    pub sessions: Arc<SessionService>,
    pub provider: Arc<dyn OidcProvider>,
    /// Absolute URL the provider returns to after ending its session
    pub post_logout_url: Url,
    pub routes: RouteConfig,
    pub state_cookie_name: String,
    pub cookie_secure: bool,
}

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub message: Option<String>,
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body style=\"font-family: sans-serif; padding: 2rem\"><h1>{title}</h1>{body}</body></html>"
    ))
}

/// The protected resource; only reachable through the gate.
pub async fn protected(State(state): State<PageState>, headers: HeaderMap) -> Response {
    let claims = match state.sessions.claims(&headers) {
        Ok(claims) => claims,
        Err(e) => {
            // The gate already checked the session, so this only races expiry.
            warn!("Session vanished behind the gate: {}", e);
            return Redirect::to(&state.routes.launch_required_path).into_response();
        }
    };

    let name = claims
        .display_name
        .as_deref()
        .or(claims.email.as_deref())
        .unwrap_or(&claims.sub);

    page(
        "Protected Resource",
        &format!(
            "<p>Welcome, {}.</p>\
             <p>Launch context: <code>{}</code></p>\
             <p>Signed in through <code>{}</code>.</p>\
             <p><a href=\"{}\">Sign out</a></p>",
            escape_html(name),
            escape_html(&claims.launch_context),
            escape_html(&claims.provider_id),
            escape_html(&state.routes.logout_path),
        ),
    )
    .into_response()
}

pub async fn launch_required() -> Html<String> {
    page(
        "Launch Required",
        "<p>This resource can only be opened from your learning platform.</p>\
         <p>Please return to your course and launch the tool again.</p>",
    )
}

pub async fn auth_error(Query(query): Query<ErrorQuery>) -> Html<String> {
    let message = query
        .message
        .unwrap_or_else(|| "An unknown authentication error occurred.".to_string());

    page(
        "Authentication Error",
        &format!(
            "<p>An error occurred during the authentication process:</p><pre>{}</pre>\
             <p>Please try accessing the application again from your learning platform. \
             If the problem persists, contact support.</p>",
            escape_html(&message)
        ),
    )
}

/// Drop the session and any in-flight login attempt, then end the provider
/// session when the provider supports it.
pub async fn logout(State(state): State<PageState>, jar: CookieJar, headers: HeaderMap) -> Response {
    let secure = state.cookie_secure || request_is_https(&headers);
    let jar = clear_cookie(jar, state.sessions.cookie_name(), secure);
    let jar = clear_cookie(jar, &state.state_cookie_name, secure);

    match state.provider.end_session_url(&state.post_logout_url) {
        Some(url) => {
            info!(provider = state.provider.provider_id(), "Session ended, signing out of provider");
            (jar, Redirect::to(url.as_str())).into_response()
        }
        None => {
            info!("Session ended");
            (jar, Redirect::to(&state.routes.launch_required_path)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
        assert_eq!(escape_html("XYZ123"), "XYZ123");
    }
}
