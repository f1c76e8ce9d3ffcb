//! Storage data access module
//!
//! This module provides storage interfaces and implementations for
//! backend-owned, short-lived data: the nonces handed out to sign-in sessions.

use std::error::Error;

use async_trait::async_trait;

pub mod boxed;
pub mod memory;

pub use boxed::{BoxedStorage, BoxedStorageError, BoxedStorageWrapper};
pub use memory::{InMemoryStorage, InMemoryStorageError};

#[cfg(test)]
pub fn test_storage() -> std::sync::Arc<dyn BoxedStorage> {
    let memory_storage = InMemoryStorage::new();
    let boxed_storage = BoxedStorageWrapper::new(memory_storage);
    std::sync::Arc::new(boxed_storage)
}

/// Storage trait for backend-specific data operations
///
/// This trait provides an abstraction over different storage backends (in-memory, Redis, etc.)
/// so the nonce store can be injected instead of living in a global.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Error type for storage operations
    type Error: Error + Send + Sync + 'static;

    /// Whether the storage backend is reachable
    async fn health_check(&self) -> Result<bool, Self::Error>;

    /// Store the nonce minted for a session, replacing any previous one
    ///
    /// # Arguments
    /// * `session_id` - Opaque identifier of the requesting session
    /// * `nonce` - The nonce the session is expected to sign
    /// * `expiration_seconds` - How long the nonce can be redeemed for
    async fn store_nonce(
        &self,
        session_id: String,
        nonce: String,
        expiration_seconds: u64,
    ) -> Result<(), Self::Error>;

    /// Remove and return the nonce of a session
    ///
    /// Expired nonces are removed as well but reported as absent, so a nonce
    /// can be redeemed at most once.
    async fn take_nonce(&self, session_id: &str) -> Result<Option<String>, Self::Error>;

    /// Drop every expired nonce
    ///
    /// # Returns
    /// The number of removed entries
    async fn purge_expired(&self) -> Result<usize, Self::Error>;
}
