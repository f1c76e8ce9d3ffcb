use axum::{extract::State, response::IntoResponse, Json};

use crate::services::Services;

pub mod auth;

pub async fn health_check(State(services): State<Services>) -> impl IntoResponse {
    Json(services.health.check_health().await)
}
