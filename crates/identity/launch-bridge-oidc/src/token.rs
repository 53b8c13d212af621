//! Random protocol values (CSRF tokens and nonces).

use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};

/// Length of every CSRF token and nonce minted by the bridge.
pub const PROTOCOL_TOKEN_LEN: usize = 32;

/// Mint a single-use protocol value from the thread-local CSPRNG.
///
/// CSRF tokens and nonces both come from here so they share one entropy source.
pub fn random_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PROTOCOL_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = random_token();
        assert_eq!(token.len(), PROTOCOL_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<String> = (0..100).map(|_| random_token()).collect();
        assert_eq!(tokens.len(), 100);
    }
}
