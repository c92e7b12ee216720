//! Payment handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::json;

use pms_core::attachment::PAYMENT_ATTACHMENTS;
use pms_core::domain::payment::{CreatePaymentRequest, PaymentStatusRequest};
use pms_core::domain::{Payment, Unit, User};
use pms_core::notification::{Notification, Template};
use pms_core::Entity;

use super::resource::{self, parse_id};
use crate::error::ApiError;
use crate::extractors::{Payload, ValidJson};
use crate::middleware::AuthUser;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    resource::list::<Payment>(&state, &user, params).await
}

pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    resource::stats::<Payment>(&state, &user).await
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::detail::<Payment>(&state, &user, parse_id(&id)?).await
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Payment::DESCRIPTOR.policy.create)?;
    let req: CreatePaymentRequest = payload.parse()?;

    resource::ensure_reference::<Unit>(&state, &user, req.unit_id, "unitId").await?;
    resource::ensure_reference::<User>(&state, &user, req.resident, "resident").await?;

    let attachments = resource::store_files(&state, &payload, PAYMENT_ATTACHMENTS).await?;
    let payment = Payment::new(user.tenant_id, req, attachments.clone());
    let data =
        resource::discard_on_error(&state, &attachments, resource::insert(&state, &payment).await).await?;

    if let Some(recipient) = resource::recipient(&state, payment.resident).await {
        resource::notify(
            &state,
            vec![Notification::new(
                recipient,
                Template::PaymentCreated,
                json!({
                    "type": payment.kind,
                    "amount": payment.amount,
                    "currency": payment.currency,
                    "dueDate": payment.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                }),
            )],
        )
        .await;
    }

    Ok(resource::created(data, "Pembayaran berhasil dibuat"))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<PaymentStatusRequest>,
) -> Result<Response, ApiError> {
    user.require(Payment::DESCRIPTOR.policy.update)?;
    let mut payment = resource::load_owned::<Payment>(&state, &user, parse_id(&id)?).await?;

    payment.change_status(req.status, req.reference);
    let data = resource::save(&state, &payment).await?;

    if let Some(recipient) = resource::recipient(&state, payment.resident).await {
        resource::notify(
            &state,
            vec![Notification::new(
                recipient,
                Template::PaymentStatusChanged,
                json!({
                    "amount": payment.amount,
                    "currency": payment.currency,
                    "status": payment.status.as_str(),
                }),
            )],
        )
        .await;
    }

    Ok(resource::updated(data, "Status pembayaran berhasil diperbarui"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::soft_delete::<Payment>(&state, &user, parse_id(&id)?).await?;
    Ok(resource::deleted("Pembayaran berhasil dihapus"))
}
