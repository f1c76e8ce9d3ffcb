//! In-memory storage implementation
//!
//! This module provides a thread-safe in-memory implementation of the Storage trait,
//! suitable for single-instance deployments and testing environments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::Storage;

/// Errors that can occur during in-memory storage operations
#[derive(Debug, Error)]
pub enum InMemoryStorageError {
    /// Lock poisoned error
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

#[derive(Debug, Clone)]
struct PendingNonce {
    nonce: String,
    expires_at: DateTime<Utc>,
}

impl PendingNonce {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory storage implementation using Arc<RwLock<HashMap>>
///
/// All data is lost when the process terminates.
#[derive(Clone)]
pub struct InMemoryStorage {
    /// Pending nonces, keyed by session id
    nonces: Arc<RwLock<HashMap<String, PendingNonce>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            nonces: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    type Error = InMemoryStorageError;

    async fn health_check(&self) -> Result<bool, Self::Error> {
        self.nonces
            .read()
            .map(|_| true)
            .map_err(|e| InMemoryStorageError::LockPoisoned(e.to_string()))
    }

    async fn store_nonce(
        &self,
        session_id: String,
        nonce: String,
        expiration_seconds: u64,
    ) -> Result<(), Self::Error> {
        let expires_at = i64::try_from(expiration_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut nonces = self
            .nonces
            .write()
            .map_err(|e| InMemoryStorageError::LockPoisoned(e.to_string()))?;

        nonces.insert(session_id, PendingNonce { nonce, expires_at });
        Ok(())
    }

    async fn take_nonce(&self, session_id: &str) -> Result<Option<String>, Self::Error> {
        let mut nonces = self
            .nonces
            .write()
            .map_err(|e| InMemoryStorageError::LockPoisoned(e.to_string()))?;

        Ok(nonces
            .remove(session_id)
            .filter(|pending| !pending.is_expired(Utc::now()))
            .map(|pending| pending.nonce))
    }

    async fn purge_expired(&self) -> Result<usize, Self::Error> {
        let mut nonces = self
            .nonces
            .write()
            .map_err(|e| InMemoryStorageError::LockPoisoned(e.to_string()))?;

        let now = Utc::now();
        let before = nonces.len();
        nonces.retain(|_, pending| !pending.is_expired(now));
        Ok(before - nonces.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_nonce_once() {
        let storage = InMemoryStorage::new();

        storage
            .store_nonce("session".to_string(), "abc123".to_string(), 60)
            .await
            .unwrap();

        // First take returns the nonce
        let result = storage.take_nonce("session").await.unwrap();
        assert_eq!(result.as_deref(), Some("abc123"));

        // Second take finds nothing
        let result = storage.take_nonce("session").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let storage = InMemoryStorage::new();

        let result = storage.take_nonce("missing").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_store_replaces_previous_nonce() {
        let storage = InMemoryStorage::new();

        storage
            .store_nonce("session".to_string(), "first".to_string(), 60)
            .await
            .unwrap();
        storage
            .store_nonce("session".to_string(), "second".to_string(), 60)
            .await
            .unwrap();

        let result = storage.take_nonce("session").await.unwrap();
        assert_eq!(result.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let storage = InMemoryStorage::new();

        storage
            .store_nonce("a".to_string(), "nonceA".to_string(), 60)
            .await
            .unwrap();
        storage
            .store_nonce("b".to_string(), "nonceB".to_string(), 60)
            .await
            .unwrap();

        assert_eq!(
            storage.take_nonce("b").await.unwrap().as_deref(),
            Some("nonceB")
        );
        assert_eq!(
            storage.take_nonce("a").await.unwrap().as_deref(),
            Some("nonceA")
        );
    }

    #[tokio::test]
    async fn test_expired_nonce_is_absent() {
        let storage = InMemoryStorage::new();

        storage
            .store_nonce("session".to_string(), "abc123".to_string(), 0)
            .await
            .unwrap();

        let result = storage.take_nonce("session").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let storage = InMemoryStorage::new();

        storage
            .store_nonce("stale".to_string(), "old".to_string(), 0)
            .await
            .unwrap();
        storage
            .store_nonce("fresh".to_string(), "new".to_string(), 60)
            .await
            .unwrap();

        let purged = storage.purge_expired().await.unwrap();
        assert_eq!(purged, 1);

        assert_eq!(
            storage.take_nonce("fresh").await.unwrap().as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let storage = InMemoryStorage::new();
        assert!(storage.health_check().await.unwrap());
    }
}
