//! OIDC side of the LTI to OIDC launch bridge.
//!
//! This crate owns everything that happens between "this launch needs a login"
//! and "this callback belongs to that login":
//!
//! - [`StateTokenCodec`] signs and verifies the state cookie
//! - [`LaunchStateEncoder`] builds and reads the public `state` parameter
//! - [`AuthorizationRequestBuilder`] produces the provider redirect URL
//! - [`CallbackValidator`] reconciles a callback with its cookie
//! - [`OidcClient`] exchanges authorization codes with Logto, Auth0 or any
//!   standards-compliant issuer
//!
//! # Example
//!
//! ```rust,no_run
//! use launch_bridge_core::{OidcProvider, ProviderConfig, ProviderKind};
//! use launch_bridge_oidc::{LaunchStateEncoder, OidcClient, random_token};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OidcClient::new(ProviderConfig {
//!     kind: ProviderKind::Logto,
//!     base_url: "https://tenant.logto.app".to_string(),
//!     client_id: "client".to_string(),
//!     client_secret: "secret".to_string(),
//!     redirect_uri: "https://app.example.com/auth/callback".to_string(),
//!     ..ProviderConfig::default()
//! })?;
//!
//! let state = LaunchStateEncoder::encode(&random_token(), "XYZ123");
//! let url = client.build_authorize_url(&state, Some(&random_token()));
//! println!("Redirect to {}", url);
//! # Ok(())
//! # }
//! ```

pub mod authorize;
pub mod callback;
pub mod error;
pub mod launch_state;
pub mod ledger;
pub mod provider;
pub mod state_token;
pub mod token;
pub mod types;

pub use authorize::AuthorizationRequestBuilder;
pub use callback::{CallbackValidator, ValidatedCallback};
pub use error::{OidcError, OidcResult};
pub use launch_state::{LaunchState, LaunchStateEncoder, MAX_STATE_LEN};
pub use ledger::{InMemoryReplayLedger, ReplayLedger};
pub use provider::OidcClient;
pub use state_token::{StatePayload, StateTokenCodec, VerifiedState};
pub use token::{PROTOCOL_TOKEN_LEN, random_token};
pub use types::{IdTokenClaims, TokenResponse, UserInfoResponse};

#[cfg(test)]
mod tests;
