//! Single-use bookkeeping for login attempts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use launch_bridge_core::AuthFailure;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Entries kept before a consume call sweeps out expired ones.
const SWEEP_THRESHOLD: usize = 1024;

/// Trait for recording consumed login attempts
#[async_trait]
pub trait ReplayLedger: Send + Sync {
    /// Mark an attempt consumed; fails with `Replayed` if it already was.
    ///
    /// An entry only needs to outlive `expires_at`: after that the state
    /// token itself no longer verifies.
    async fn consume(&self, attempt_id: &str, expires_at: DateTime<Utc>) -> Result<(), AuthFailure>;
}

/// In-memory ledger for single-instance deployments.
///
/// Expired entries are swept during `consume` once the map grows past a
/// threshold, so no background task is needed.
pub struct InMemoryReplayLedger {
    consumed: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    sweep_threshold: usize,
}

impl InMemoryReplayLedger {
    pub fn new() -> Self {
        Self {
            consumed: Arc::new(RwLock::new(HashMap::new())),
            sweep_threshold: SWEEP_THRESHOLD,
        }
    }
}

impl Default for InMemoryReplayLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplayLedger for InMemoryReplayLedger {
    async fn consume(&self, attempt_id: &str, expires_at: DateTime<Utc>) -> Result<(), AuthFailure> {
        let mut consumed = self.consumed.write().await;

        if consumed.len() >= self.sweep_threshold {
            let now = Utc::now();
            let before = consumed.len();
            consumed.retain(|_, expiry| *expiry >= now);
            debug!(swept = before - consumed.len(), "Swept expired login attempts");
        }

        if consumed.contains_key(attempt_id) {
            return Err(AuthFailure::Replayed);
        }

        consumed.insert(attempt_id.to_string(), expires_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_second_consume_is_replay() {
        let ledger = InMemoryReplayLedger::new();
        let expiry = Utc::now() + Duration::minutes(10);

        ledger.consume("attempt-1", expiry).await.unwrap();
        assert_eq!(
            ledger.consume("attempt-1", expiry).await,
            Err(AuthFailure::Replayed)
        );

        ledger.consume("attempt-2", expiry).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_entries_swept_on_consume() {
        let ledger = InMemoryReplayLedger {
            consumed: Arc::new(RwLock::new(HashMap::new())),
            sweep_threshold: 2,
        };

        ledger
            .consume("stale", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        ledger
            .consume("fresh", Utc::now() + Duration::minutes(10))
            .await
            .unwrap();
        ledger
            .consume("newest", Utc::now() + Duration::minutes(10))
            .await
            .unwrap();

        let consumed = ledger.consumed.read().await;
        assert_eq!(consumed.len(), 2);
        assert!(!consumed.contains_key("stale"));
        drop(consumed);

        assert_eq!(
            ledger.consume("fresh", Utc::now()).await,
            Err(AuthFailure::Replayed)
        );
    }
}
