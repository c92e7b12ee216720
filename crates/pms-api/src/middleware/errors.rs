//! Logging of unexpected server errors

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::error::{InternalDetail, INTERNAL_MESSAGE};
use crate::state::AppState;

fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return forwarded.trim().to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Logs every 500 with method, path and caller ip. In development the
/// detail is also returned to the client.
pub async fn log_server_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let ip = client_ip(&request);

    let response = next.run(request).await;
    if response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    let detail = response
        .extensions()
        .get::<InternalDetail>()
        .map(|d| d.0.clone())
        .unwrap_or_else(|| "unhandled error".to_string());
    error!(method = %method, path = %path, ip = %ip, error = %detail, "Internal server error");

    if state.is_development() {
        let body = json!({
            "success": false,
            "message": INTERNAL_MESSAGE,
            "error": detail,
        });
        return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
    }
    response
}
