//! Callback validation: reconcile the echoed `state` with the signed cookie.
//!
//! A callback moves through `NoAttemptInFlight` (no cookie) or
//! `AttemptPending` (cookie present) into one of two terminal outcomes,
//! `Validated` or `Rejected`. Terminal outcomes are never retried.

use crate::launch_state::LaunchStateEncoder;
use crate::ledger::ReplayLedger;
use crate::state_token::StateTokenCodec;
use launch_bridge_core::AuthFailure;
use std::sync::Arc;
use tracing::{debug, info};

/// What a validated callback releases to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCallback {
    pub launch_context: String,
    /// Nonce the identity token must echo
    pub nonce: Option<String>,
    pub attempt_id: String,
}

#[derive(Clone)]
pub struct CallbackValidator {
    codec: Arc<StateTokenCodec>,
    ledger: Option<Arc<dyn ReplayLedger>>,
}

impl CallbackValidator {
    pub fn new(codec: Arc<StateTokenCodec>) -> Self {
        Self {
            codec,
            ledger: None,
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn ReplayLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Validate a callback.
    ///
    /// `cookie` is the state cookie value and `raw_state` the undecoded `state`
    /// query value. The caller must delete the state cookie on the response
    /// whatever this returns, and owns logging of the rejection.
    pub async fn validate(
        &self,
        cookie: Option<&str>,
        raw_state: Option<&str>,
    ) -> Result<ValidatedCallback, AuthFailure> {
        let result = self.run(cookie, raw_state).await;

        match &result {
            Ok(validated) => info!(
                attempt_id = %validated.attempt_id,
                "Login state validated"
            ),
            Err(failure) => debug!(
                reason = failure.reason_code(),
                "Login state rejected"
            ),
        }

        result
    }

    async fn run(
        &self,
        cookie: Option<&str>,
        raw_state: Option<&str>,
    ) -> Result<ValidatedCallback, AuthFailure> {
        let Some(cookie) = cookie.filter(|value| !value.is_empty()) else {
            return Err(AuthFailure::MissingCookie);
        };
        debug!("Callback has a login attempt in flight");

        let verified = self.codec.verify(cookie)?;
        let state = LaunchStateEncoder::decode(raw_state.unwrap_or_default())?;

        if !constant_time_eq(state.csrf_token.as_bytes(), verified.payload.csrf.as_bytes()) {
            return Err(AuthFailure::CsrfMismatch);
        }

        if let Some(ledger) = &self.ledger {
            ledger
                .consume(&verified.attempt_id, verified.expires_at)
                .await?;
        }

        Ok(ValidatedCallback {
            launch_context: state.launch_context,
            nonce: verified.payload.nonce,
            attempt_id: verified.attempt_id,
        })
    }

    /// Check the nonce echoed in the identity token against the one bound to
    /// the attempt. Required after every code exchange.
    pub fn reconcile_nonce(
        &self,
        expected: Option<&str>,
        received: Option<&str>,
    ) -> Result<(), AuthFailure> {
        match (expected, received) {
            (None, _) => Ok(()),
            (Some(expected), Some(received))
                if constant_time_eq(expected.as_bytes(), received.as_bytes()) =>
            {
                Ok(())
            }
            _ => Err(AuthFailure::NonceMismatch),
        }
    }
}

/// Exact equality without an early exit on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
