//! Failure taxonomy shared by every bridge component.

use thiserror::Error;

/// Reasons a login attempt is rejected.
///
/// Every variant is fail-closed: a rejected attempt is never downgraded to an
/// anonymous continuation and is never retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// The callback arrived without a state cookie.
    #[error("State cookie missing")]
    MissingCookie,

    /// The state cookie was signed with a different key.
    #[error("State cookie signature invalid")]
    InvalidSignature,

    /// The state cookie is past its expiry.
    #[error("State cookie expired")]
    Expired,

    /// The state cookie could not be parsed.
    #[error("State cookie malformed")]
    Malformed,

    /// The `state` query parameter is absent or not a valid encoding.
    #[error("State parameter malformed")]
    MalformedState,

    /// The CSRF value in `state` does not match the signed cookie.
    #[error("CSRF token mismatch")]
    CsrfMismatch,

    /// No session and no launch context on the inbound request.
    #[error("Launch context missing")]
    MissingLaunchContext,

    /// The identity token did not echo the nonce bound to this attempt.
    #[error("Nonce mismatch")]
    NonceMismatch,

    /// The login attempt was already consumed.
    #[error("Login attempt already consumed")]
    Replayed,

    /// The provider answered the authorization request with an error.
    #[error("Provider denied authorization: {0}")]
    ProviderDenied(String),

    /// The callback carried no authorization code.
    #[error("Missing authorization code")]
    MissingCode,

    /// The provider adapter failed to exchange the code.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// The session collaborator could not establish a session.
    #[error("Session error: {0}")]
    SessionFailed(String),
}

impl AuthFailure {
    /// Stable reason code for operator logs.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthFailure::MissingCookie => "missing_cookie",
            AuthFailure::InvalidSignature => "invalid_signature",
            AuthFailure::Expired => "expired",
            AuthFailure::Malformed => "malformed",
            AuthFailure::MalformedState => "malformed_state",
            AuthFailure::CsrfMismatch => "csrf_mismatch",
            AuthFailure::MissingLaunchContext => "missing_launch_context",
            AuthFailure::NonceMismatch => "nonce_mismatch",
            AuthFailure::Replayed => "replayed",
            AuthFailure::ProviderDenied(_) => "provider_denied",
            AuthFailure::MissingCode => "missing_code",
            AuthFailure::ProviderError(_) => "provider_error",
            AuthFailure::SessionFailed(_) => "session_failed",
        }
    }

    /// Message shown to the end user. All state checks share one message.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthFailure::MissingLaunchContext => "Launch Required",
            AuthFailure::ProviderDenied(_)
            | AuthFailure::MissingCode
            | AuthFailure::ProviderError(_)
            | AuthFailure::SessionFailed(_) => "Login Failed",
            _ => "Invalid Login State",
        }
    }
}

/// Startup-fatal configuration problems.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors raised by provider adapters and the session collaborator.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Session error: {0}")]
    SessionError(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;
