//! Services module for the SIWE auth backend

pub mod auth;
pub mod health;

use std::sync::Arc;

use crate::{config::Config, data::storage::BoxedStorage, error::Error};

#[derive(Clone)]
pub struct Services {
    pub auth: Arc<auth::AuthService>,
    pub health: Arc<health::HealthService>,
    pub storage: Arc<dyn BoxedStorage>,
}

impl Services {
    pub fn new(config: &Config, storage: Arc<dyn BoxedStorage>) -> Result<Self, Error> {
        let auth = Arc::new(auth::AuthService::new(&config.auth, storage.clone())?);
        let health = Arc::new(health::HealthService::new(storage.clone()));

        Ok(Self {
            auth,
            health,
            storage,
        })
    }
}

#[cfg(test)]
impl Services {
    /// Services backed by in-memory storage, allowing the test origins
    pub fn mocks() -> Self {
        use crate::constants::test::origin::{LOCAL_ORIGIN, TEST_ORIGIN};

        let mut config = Config::default();
        config.auth.allowed_origins = vec![TEST_ORIGIN.to_string(), LOCAL_ORIGIN.to_string()];

        Self::mocks_with_config(&config)
    }

    pub fn mocks_with_config(config: &Config) -> Self {
        Self::new(config, crate::data::storage::test_storage())
            .expect("test configuration should be valid")
    }
}
