//! API module for the SIWE auth backend

pub mod handlers;
pub mod routes;

use axum::{
    http::{
        header::{
            HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, REFERRER_POLICY,
            X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        Method,
    },
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::services::Services;

/// Headers added to every response
const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (X_FRAME_OPTIONS, "DENY"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (X_XSS_PROTECTION, "1; mode=block"),
];

/// Creates the axum application with all routes and middleware
pub fn create_app(services: Services) -> Router {
    // The session cookie has to travel with cross-origin requests,
    // so only the allow-listed origins get credentialed CORS access
    let origins: Vec<HeaderValue> = services
        .auth
        .allowed_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(&origin.origin().ascii_serialization()).ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .allow_credentials(true);

    let mut router = routes::routes(services);
    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(
            name,
            HeaderValue::from_static(value),
        ));
    }

    router.layer(cors).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
/// Create a test application
///
/// This function creates a test application with mock services.
pub fn mock_app() -> Router {
    let services = Services::mocks();
    create_app(services)
}
