//! Route definitions for the SIWE auth API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::{
    constants::auth::{AUTH_NONCE_ENDPOINT, AUTH_SESSION_ENDPOINT, AUTH_VERIFY_ENDPOINT},
    services::Services,
};

/// Creates the router with all API routes
pub fn routes(services: Services) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(handlers::health_check))
        // Sign-in flow
        .route(AUTH_NONCE_ENDPOINT, post(handlers::auth::nonce))
        .route(AUTH_VERIFY_ENDPOINT, post(handlers::auth::verify))
        .route(AUTH_SESSION_ENDPOINT, get(handlers::auth::session))
        // Add state to all routes
        .with_state(services)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use super::*;

    #[tokio::test]
    async fn test_health_route() {
        let app = routes(Services::mocks());
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let json: serde_json::Value = response.json();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["components"]["storage"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_auth_methods() {
        let server = TestServer::new(routes(Services::mocks())).unwrap();

        let response = server.get(AUTH_NONCE_ENDPOINT).await;
        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let response = server.post(AUTH_SESSION_ENDPOINT).await;
        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
