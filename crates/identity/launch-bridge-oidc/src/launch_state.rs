//! The public `state` parameter round-tripped through the provider.
//!
//! The encoding is transparent to the provider and carries no integrity of its
//! own: it is only trusted once its `csrfToken` matches the signed cookie.

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use launch_bridge_core::AuthFailure;
use serde::{Deserialize, Serialize};

/// Longest encoded `state` value accepted back from a provider.
pub const MAX_STATE_LEN: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchState {
    pub csrf_token: String,
    pub launch_context: String,
}

pub struct LaunchStateEncoder;

impl LaunchStateEncoder {
    /// Encode the CSRF/launch-context pairing as URL-safe base64 JSON.
    pub fn encode(csrf_token: &str, launch_context: &str) -> String {
        let json = serde_json::json!({
            "csrfToken": csrf_token,
            "launchContext": launch_context,
        });
        URL_SAFE_NO_PAD.encode(json.to_string())
    }

    /// Decode a raw `state` value exactly as the provider echoed it.
    pub fn decode(state: &str) -> Result<LaunchState, AuthFailure> {
        if state.is_empty() || state.len() > MAX_STATE_LEN {
            return Err(AuthFailure::MalformedState);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(state)
            .or_else(|_| URL_SAFE.decode(state))
            .map_err(|_| AuthFailure::MalformedState)?;

        let decoded: LaunchState =
            serde_json::from_slice(&bytes).map_err(|_| AuthFailure::MalformedState)?;

        if decoded.csrf_token.is_empty() {
            return Err(AuthFailure::MalformedState);
        }

        Ok(decoded)
    }
}
