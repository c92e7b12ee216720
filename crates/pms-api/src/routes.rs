// ============================================================================
// PMS API - Router
// File: crates/pms-api/src/routes.rs
// ============================================================================
//! Route table. Public auth/onboarding routes are merged with the
//! protected resource routes, which sit behind [`require_auth`].

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use crate::error::INTERNAL_MESSAGE;
use crate::handlers::{
    announcements, auth, complaints, health, maintenance, payments, properties, tenants, units,
    users,
};
use crate::middleware::{log_server_errors, require_auth};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Multipart bodies may carry up to this many files of `max_file_size`
const MAX_FILES_PER_REQUEST: usize = 5;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_file_size * (MAX_FILES_PER_REQUEST + 1);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api", public_routes().merge(protected_routes(state.clone())))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(state.clone(), log_server_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify-email/{token}", get(auth::verify_email))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password/{token}", post(auth::reset_password))
        .route("/tenants/onboard", post(tenants::onboard))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", put(auth::change_password))
        // Tenants
        .route("/tenants", get(tenants::list))
        .route("/tenants/stats", get(tenants::stats))
        .route(
            "/tenants/{id}",
            get(tenants::detail).put(tenants::update).delete(tenants::delete),
        )
        .route("/tenants/{id}/subscription", patch(tenants::update_subscription))
        // Users
        .route("/users", get(users::list).post(users::create))
        .route("/users/stats", get(users::stats))
        .route(
            "/users/{id}",
            get(users::detail).put(users::update).delete(users::delete),
        )
        .route("/users/{id}/preferences", patch(users::update_preferences))
        .route("/users/{id}/avatar", post(users::upload_avatar))
        // Properties
        .route("/properties", get(properties::list).post(properties::create))
        .route("/properties/stats", get(properties::stats))
        .route(
            "/properties/{id}",
            get(properties::detail)
                .put(properties::update)
                .delete(properties::delete),
        )
        // Units
        .route("/units", get(units::list).post(units::create))
        .route("/units/stats", get(units::stats))
        .route(
            "/units/{id}",
            get(units::detail).put(units::update).delete(units::delete),
        )
        .route("/units/{id}/status", patch(units::update_status))
        // Announcements
        .route(
            "/announcements",
            get(announcements::list).post(announcements::create),
        )
        .route("/announcements/stats", get(announcements::stats))
        .route(
            "/announcements/{id}",
            get(announcements::detail)
                .put(announcements::update)
                .delete(announcements::delete),
        )
        .route("/announcements/{id}/view", post(announcements::view))
        // Complaints
        .route("/complaints", get(complaints::list).post(complaints::create))
        .route("/complaints/stats", get(complaints::stats))
        .route(
            "/complaints/{id}",
            get(complaints::detail).delete(complaints::delete),
        )
        .route("/complaints/{id}/status", patch(complaints::update_status))
        .route("/complaints/{id}/comments", post(complaints::add_comment))
        .route("/complaints/{id}/feedback", post(complaints::submit_feedback))
        // Payments
        .route("/payments", get(payments::list).post(payments::create))
        .route("/payments/stats", get(payments::stats))
        .route(
            "/payments/{id}",
            get(payments::detail).delete(payments::delete),
        )
        .route("/payments/{id}/status", patch(payments::update_status))
        // Maintenance
        .route(
            "/maintenance",
            get(maintenance::list).post(maintenance::create),
        )
        .route("/maintenance/stats", get(maintenance::stats))
        .route(
            "/maintenance/{id}",
            get(maintenance::detail)
                .put(maintenance::update)
                .delete(maintenance::delete),
        )
        .route("/maintenance/{id}/status", patch(maintenance::update_status))
        .route("/maintenance/{id}/assign", patch(maintenance::assign))
        .route_layer(from_fn_with_state(state, require_auth))
}

async fn not_found() -> Response {
    ApiResponse::failure("Endpoint tidak ditemukan", None).into_response_with(StatusCode::NOT_FOUND)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Handler panicked");
    ApiResponse::failure(INTERNAL_MESSAGE, None).into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    use super::handle_panic;
    use crate::test_support::TestApp;

    #[tokio::test]
    async fn test_handler_panic_becomes_internal_error() {
        async fn boom() -> &'static str {
            panic!("index out of range")
        }
        let router = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(handle_panic));

        let response = router
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert!(!body.to_string().contains("index out of range"));
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = TestApp::new();

        let (status, body) = app.json(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");

        let (status, body) = app.json(Method::GET, "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ready");
    }

    #[tokio::test]
    async fn test_unknown_route_uses_envelope() {
        let app = TestApp::new();
        let (status, body) = app.json(Method::GET, "/api/nothing-here", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_protected_route_without_token() {
        let app = TestApp::new();
        let (status, body) = app.json(Method::GET, "/api/properties", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Autentikasi diperlukan");
    }
}
