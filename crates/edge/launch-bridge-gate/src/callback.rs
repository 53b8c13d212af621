//! The provider callback endpoint.

use crate::cookies::{clear_state_cookie, request_is_https, set_session_cookie};
use crate::{GateState, failure_redirect};
use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::cookie::CookieJar;
use launch_bridge_core::{AuthFailure, SessionGrant};
use tracing::{debug, error, info, warn};

/// Query parameters a provider sends back to the redirect URI
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match &*key {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Router with the callback endpoint mounted at the configured path.
pub fn callback_routes(gate: GateState) -> Router {
    let path = gate.config().routes.callback_path.clone();
    Router::new()
        .route(&path, get(callback_handler))
        .with_state(gate)
}

/// Handle the provider's redirect back. Every response deletes the state cookie.
pub async fn callback_handler(
    State(gate): State<GateState>,
    jar: CookieJar,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let config = gate.config();
    let secure = config.state_cookie.secure || request_is_https(&headers);
    let params = CallbackParams::from_query(query.as_deref());

    let state_cookie = jar
        .get(&config.state_cookie.name)
        .map(|cookie| cookie.value().to_string());
    let jar = clear_state_cookie(jar, &config.state_cookie, secure);

    match complete_login(&gate, state_cookie.as_deref(), params).await {
        Ok(grant) => {
            let jar = set_session_cookie(jar, grant, secure);
            (jar, Redirect::to(&config.routes.post_login_path)).into_response()
        }
        Err(failure) => {
            warn!(
                reason = failure.reason_code(),
                "Login callback rejected: {}", failure
            );
            (jar, failure_redirect(&config.routes, &failure)).into_response()
        }
    }
}

async fn complete_login(
    gate: &GateState,
    state_cookie: Option<&str>,
    params: CallbackParams,
) -> Result<SessionGrant, AuthFailure> {
    let validated = gate
        .validator
        .validate(state_cookie, params.state.as_deref())
        .await?;

    if let Some(error) = params.error {
        debug!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Provider returned an error"
        );
        return Err(AuthFailure::ProviderDenied(error));
    }

    if validated.launch_context.is_empty() {
        return Err(AuthFailure::MissingLaunchContext);
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(AuthFailure::MissingCode)?;

    let session = gate.provider.exchange_code(&code).await.map_err(|e| {
        error!(provider = gate.provider.provider_id(), "Code exchange failed: {}", e);
        AuthFailure::ProviderError(e.to_string())
    })?;

    gate.validator
        .reconcile_nonce(validated.nonce.as_deref(), session.nonce.as_deref())?;

    let grant = gate
        .sessions
        .establish(&session.identity, &validated.launch_context)
        .map_err(|e| {
            error!("Failed to establish session: {}", e);
            AuthFailure::SessionFailed(e.to_string())
        })?;

    info!(
        subject = %session.identity.subject,
        attempt_id = %validated.attempt_id,
        "Login completed"
    );
    Ok(grant)
}
