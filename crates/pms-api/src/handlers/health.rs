use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;
use tracing::error;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health_check() -> Response {
    ApiResponse::success(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
    .into_response_with(StatusCode::OK)
}

/// Ready once the document store answers
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => ApiResponse::success(HealthResponse {
            status: "ready",
            version: env!("CARGO_PKG_VERSION"),
        })
        .into_response_with(StatusCode::OK),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            ApiResponse::failure("Database tidak tersedia", None)
                .into_response_with(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
