//! The edge gate middleware.

use crate::GateState;
use crate::cookies::{clear_state_cookie, request_is_https, set_state_cookie};
use crate::decision::{GateDecision, decide};
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use launch_bridge_oidc::{LaunchStateEncoder, StatePayload, random_token};
use tracing::{debug, error};

/// Axum middleware enforcing the gate's decision table.
///
/// Mount with `axum::middleware::from_fn_with_state(gate, edge_gate)` on the
/// protected routes only; the callback, error and launch-required routes must
/// stay outside.
pub async fn edge_gate(
    State(gate): State<GateState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let config = gate.config();
    let secure = config.state_cookie.secure || request_is_https(request.headers());
    let has_session = gate.sessions.has_session(request.headers());
    let launch_context = launch_param(request.uri(), &config.routes.launch_param);
    let has_state_cookie = jar.get(&config.state_cookie.name).is_some();

    match decide(has_session, launch_context.as_deref(), has_state_cookie) {
        GateDecision::PassThrough { clear_stale_cookie } => {
            let response = next.run(request).await;
            if clear_stale_cookie {
                debug!("Clearing stale state cookie for an existing session");
                (clear_state_cookie(jar, &config.state_cookie, secure), response).into_response()
            } else {
                response
            }
        }
        GateDecision::InitiateLogin { launch_context } => {
            initiate_login(&gate, jar, &launch_context, secure)
        }
        GateDecision::RequireLaunch => {
            debug!(path = %request.uri().path(), "No session and no launch context");
            Redirect::to(&config.routes.launch_required_path).into_response()
        }
    }
}

/// Mint a login attempt. The redirect always carries the state cookie.
fn initiate_login(gate: &GateState, jar: CookieJar, launch_context: &str, secure: bool) -> Response {
    let csrf = random_token();
    let nonce = random_token();

    let payload = StatePayload {
        csrf: csrf.clone(),
        nonce: Some(nonce.clone()),
    };
    let token = match gate.codec.create(&payload, gate.state_ttl) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to sign state token: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let state = LaunchStateEncoder::encode(&csrf, launch_context);
    let authorize_url = gate.provider.build_authorize_url(&state, Some(&nonce));
    debug!(
        provider = gate.provider.provider_id(),
        "Minted login attempt, redirecting to provider"
    );

    let jar = set_state_cookie(jar, &gate.config.state_cookie, token, secure);
    (jar, Redirect::to(authorize_url.as_str())).into_response()
}

fn launch_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
