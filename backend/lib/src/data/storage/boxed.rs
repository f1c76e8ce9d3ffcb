//! Type-erased storage implementation

use std::error::Error as StdError;

use async_trait::async_trait;

use super::Storage;

/// A boxed storage error that can wrap any storage implementation's error type
pub type BoxedStorageError = Box<dyn StdError + Send + Sync>;

/// Type-erased storage trait for use across service boundaries
#[async_trait]
pub trait BoxedStorage: Send + Sync {
    async fn health_check(&self) -> Result<bool, BoxedStorageError>;

    async fn store_nonce(
        &self,
        session_id: String,
        nonce: String,
        expiration_seconds: u64,
    ) -> Result<(), BoxedStorageError>;

    async fn take_nonce(&self, session_id: &str) -> Result<Option<String>, BoxedStorageError>;

    async fn purge_expired(&self) -> Result<usize, BoxedStorageError>;
}

/// Wrapper struct that implements BoxedStorage for any Storage implementation
pub struct BoxedStorageWrapper<S: Storage> {
    inner: S,
}

impl<S: Storage> BoxedStorageWrapper<S> {
    pub fn new(storage: S) -> Self {
        Self { inner: storage }
    }

    fn wrap_err<E: StdError + Send + Sync + 'static>(err: E) -> BoxedStorageError {
        Box::new(err) as BoxedStorageError
    }
}

#[async_trait]
impl<S> BoxedStorage for BoxedStorageWrapper<S>
where
    S: Storage + Send + Sync,
    S::Error: StdError + Send + Sync + 'static,
{
    async fn health_check(&self) -> Result<bool, BoxedStorageError> {
        self.inner.health_check().await.map_err(Self::wrap_err)
    }

    async fn store_nonce(
        &self,
        session_id: String,
        nonce: String,
        expiration_seconds: u64,
    ) -> Result<(), BoxedStorageError> {
        self.inner
            .store_nonce(session_id, nonce, expiration_seconds)
            .await
            .map_err(Self::wrap_err)
    }

    async fn take_nonce(&self, session_id: &str) -> Result<Option<String>, BoxedStorageError> {
        self.inner.take_nonce(session_id).await.map_err(Self::wrap_err)
    }

    async fn purge_expired(&self) -> Result<usize, BoxedStorageError> {
        self.inner.purge_expired().await.map_err(Self::wrap_err)
    }
}
