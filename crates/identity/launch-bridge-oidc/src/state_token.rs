//! Signed, time-limited state tokens carried in the state cookie.

use crate::error::{OidcError, OidcResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use launch_bridge_core::{AuthFailure, ConfigError, derive_signing_key, validate_secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const STATE_KEY_LABEL: &str = "launch-bridge/state-token/v1";

/// Secrets bound to one login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePayload {
    pub csrf: String,
    pub nonce: Option<String>,
}

/// A state token that passed signature and expiry checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedState {
    pub payload: StatePayload,
    /// Unique id of the login attempt (`jti`)
    pub attempt_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    jti: String,
    csrf: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    iat: i64,
    exp: i64,
}

/// Creates and verifies the HS256 tokens stored in the state cookie.
///
/// Immutable once built; share it behind an `Arc`.
pub struct StateTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl StateTokenCodec {
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        validate_secret(secret)?;
        let key = derive_signing_key(STATE_KEY_LABEL, secret);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            validation,
        })
    }

    pub fn create(&self, payload: &StatePayload, ttl: Duration) -> OidcResult<String> {
        self.create_at(payload, ttl, Utc::now())
    }

    pub(crate) fn create_at(
        &self,
        payload: &StatePayload,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> OidcResult<String> {
        if ttl <= Duration::zero() {
            return Err(OidcError::InvalidTtl);
        }

        let claims = StateClaims {
            jti: Uuid::new_v4().to_string(),
            csrf: payload.csrf.clone(),
            nonce: payload.nonce.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify a token taken from an untrusted cookie.
    pub fn verify(&self, token: &str) -> Result<VerifiedState, AuthFailure> {
        let data = decode::<StateClaims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthFailure::InvalidSignature
                }
                ErrorKind::ExpiredSignature => AuthFailure::Expired,
                _ => AuthFailure::Malformed,
            },
        )?;

        let claims = data.claims;
        if claims.csrf.is_empty() || claims.jti.is_empty() {
            return Err(AuthFailure::Malformed);
        }

        let issued_at = Utc
            .timestamp_opt(claims.iat, 0)
            .single()
            .ok_or(AuthFailure::Malformed)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AuthFailure::Malformed)?;

        Ok(VerifiedState {
            payload: StatePayload {
                csrf: claims.csrf,
                nonce: claims.nonce,
            },
            attempt_id: claims.jti,
            issued_at,
            expires_at,
        })
    }
}
