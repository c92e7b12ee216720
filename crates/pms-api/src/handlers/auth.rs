// ============================================================================
// PMS API - Authentication Handlers
// File: crates/pms-api/src/handlers/auth.rs
// ============================================================================
//! Registration, login and the password/email token flows

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde_json::json;
use tracing::info;

use pms_core::domain::user::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest,
};
use pms_core::domain::{Tenant, User};
use pms_core::services::AuthOutcome;
use pms_core::Entity;

use super::resource;
use crate::error::ApiError;
use crate::extractors::ValidJson;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

fn acknowledged(message: &str) -> Response {
    ApiResponse::message(message).into_response_with(StatusCode::OK)
}

/// `{ user, token }` with the stored secrets stripped
fn session_body(state: &AppState, outcome: &AuthOutcome) -> Result<serde_json::Value, ApiError> {
    Ok(json!({
        "user": state.repo::<User>().to_public(&outcome.user)?,
        "token": outcome.token,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.auth.register(req).await?;
    state
        .cache
        .invalidate(User::DESCRIPTOR.collection, None, outcome.user.tenant_id)
        .await;
    // first registration on an empty install creates the default tenant
    state
        .cache
        .invalidate(Tenant::DESCRIPTOR.collection, None, outcome.user.tenant_id)
        .await;

    let body = session_body(&state, &outcome)?;
    resource::notify(&state, outcome.notifications).await;
    Ok(resource::created(body, "Registrasi berhasil"))
}

pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.auth.login(req).await?;
    state
        .cache
        .invalidate(
            User::DESCRIPTOR.collection,
            Some(outcome.user.id),
            outcome.user.tenant_id,
        )
        .await;

    let body = session_body(&state, &outcome)?;
    Ok(resource::updated(body, "Login berhasil"))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let repo = state.repo::<User>();
    let current = repo.find_active(user.id).await?;
    let data = repo.to_public(&current)?;
    Ok(ApiResponse::success(data).into_response_with(StatusCode::OK))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let user = state.auth.verify_email(&token).await?;
    state
        .cache
        .invalidate(User::DESCRIPTOR.collection, Some(user.id), user.tenant_id)
        .await;
    Ok(acknowledged("Email berhasil diverifikasi"))
}

/// Always answers with the same message whether or not the email exists
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> Result<Response, ApiError> {
    let notifications = state.auth.forgot_password(req).await?;
    resource::notify(&state, notifications).await;
    Ok(acknowledged(
        "Jika email terdaftar, tautan reset password telah dikirim",
    ))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.auth.reset_password(&token, req).await?;
    state
        .cache
        .invalidate(
            User::DESCRIPTOR.collection,
            Some(outcome.user.id),
            outcome.user.tenant_id,
        )
        .await;

    let body = session_body(&state, &outcome)?;
    resource::notify(&state, outcome.notifications).await;
    Ok(resource::updated(body, "Password berhasil direset"))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    let notifications = state.auth.change_password(user.id, req).await?;
    info!(user_id = %user.id, "password changed via API");
    resource::notify(&state, notifications).await;
    Ok(acknowledged("Password berhasil diubah"))
}
