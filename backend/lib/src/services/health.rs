use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::{constants::server::SERVICE_NAME, data::storage::BoxedStorage};

#[derive(Serialize)]
pub struct DetailedHealthStatus {
    pub status: String,
    pub version: String,
    pub service: String,
    pub components: HealthComponents,
}

#[derive(Serialize)]
pub struct HealthComponents {
    pub storage: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            message: None,
        }
    }

    fn unhealthy(message: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message),
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

pub struct HealthService {
    storage: Arc<dyn BoxedStorage>,
}

impl HealthService {
    pub fn new(storage: Arc<dyn BoxedStorage>) -> Self {
        Self { storage }
    }

    pub async fn check_health(&self) -> DetailedHealthStatus {
        let storage_health = self.check_storage().await;

        let overall_status = if storage_health.is_healthy() {
            "healthy"
        } else {
            "unhealthy"
        };

        DetailedHealthStatus {
            status: overall_status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: SERVICE_NAME.to_string(),
            components: HealthComponents {
                storage: storage_health,
            },
        }
    }

    async fn check_storage(&self) -> ComponentHealth {
        match self.storage.health_check().await {
            Ok(true) => ComponentHealth::healthy(),
            Ok(false) => ComponentHealth::unhealthy("Storage unavailable".to_string()),
            Err(e) => {
                warn!(target: "health_service::check_storage", error = %e, "Storage health check failed");
                ComponentHealth::unhealthy(format!("Storage error: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::test_storage;

    #[tokio::test]
    async fn reports_healthy_storage() {
        let health = HealthService::new(test_storage());

        let status = health.check_health().await;
        assert_eq!(status.status, "healthy");
        assert_eq!(status.service, SERVICE_NAME);
        assert_eq!(status.components.storage.status, "healthy");
        assert!(status.components.storage.message.is_none());
    }
}
