//! Maintenance task handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::{json, Value};

use pms_core::attachment::MAINTENANCE_IMAGES;
use pms_core::domain::common::{MANAGEMENT, OPERATIONS};
use pms_core::domain::maintenance::{
    AssignMaintenanceRequest, CreateMaintenanceRequest, MaintenanceStatusRequest,
    UpdateMaintenanceRequest,
};
use pms_core::domain::{Maintenance, Property, Unit, User};
use pms_core::notification::{Notification, Template};
use pms_core::Entity;

use super::resource::{self, parse_id};
use crate::error::ApiError;
use crate::extractors::{Payload, ValidJson};
use crate::middleware::AuthUser;
use crate::state::AppState;

fn mail_context(task: &Maintenance) -> Value {
    json!({
        "title": task.title,
        "priority": task.priority,
        "status": task.status.as_str(),
        "startDate": task.schedule.start_date.format("%Y-%m-%d %H:%M").to_string(),
        "endDate": task.schedule.end_date.format("%Y-%m-%d %H:%M").to_string(),
    })
}

async fn notify_assignee(state: &AppState, task: &Maintenance) {
    let Some(assignee) = task.assigned_to else {
        return;
    };
    if let Some(recipient) = resource::recipient(state, assignee).await {
        resource::notify(
            state,
            vec![Notification::new(
                recipient,
                Template::MaintenanceAssigned,
                mail_context(task),
            )],
        )
        .await;
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    resource::list::<Maintenance>(&state, &user, params).await
}

pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    resource::stats::<Maintenance>(&state, &user).await
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::detail::<Maintenance>(&state, &user, parse_id(&id)?).await
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Maintenance::DESCRIPTOR.policy.create)?;
    let req: CreateMaintenanceRequest = payload.parse()?;

    resource::ensure_reference::<Property>(&state, &user, req.property_id, "propertyId").await?;
    resource::ensure_reference::<Unit>(&state, &user, req.unit_id, "unitId").await?;
    if let Some(assignee) = req.assigned_to {
        resource::ensure_reference::<User>(&state, &user, assignee, "assignedTo").await?;
    }

    let images = resource::store_files(&state, &payload, MAINTENANCE_IMAGES).await?;
    let task = Maintenance::new(user.tenant_id, req, images.clone());
    let data =
        resource::discard_on_error(&state, &images, resource::insert(&state, &task).await).await?;

    let recipients = resource::staff_with_roles(&state, user.tenant_id, MANAGEMENT).await;
    resource::notify(
        &state,
        Notification::fan_out(recipients, Template::MaintenanceScheduled, mail_context(&task)),
    )
    .await;
    notify_assignee(&state, &task).await;

    Ok(resource::created(data, "Tugas pemeliharaan berhasil dibuat"))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Maintenance::DESCRIPTOR.policy.update)?;
    let req: UpdateMaintenanceRequest = payload.parse()?;
    let mut task = resource::load_owned::<Maintenance>(&state, &user, parse_id(&id)?).await?;

    let images = resource::store_files(&state, &payload, MAINTENANCE_IMAGES).await?;
    task.apply(req, images.clone());
    let data = resource::discard_on_error(&state, &images, resource::save(&state, &task).await).await?;
    Ok(resource::updated(data, "Tugas pemeliharaan berhasil diperbarui"))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<MaintenanceStatusRequest>,
) -> Result<Response, ApiError> {
    user.require(OPERATIONS)?;
    let mut task = resource::load_owned::<Maintenance>(&state, &user, parse_id(&id)?).await?;

    task.change_status(req.status, user.id, &req)?;
    let data = resource::save(&state, &task).await?;

    let recipients = resource::staff_with_roles(&state, user.tenant_id, MANAGEMENT).await;
    resource::notify(
        &state,
        Notification::fan_out(recipients, Template::MaintenanceStatusChanged, mail_context(&task)),
    )
    .await;

    Ok(resource::updated(data, "Status pemeliharaan berhasil diperbarui"))
}

pub async fn assign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<AssignMaintenanceRequest>,
) -> Result<Response, ApiError> {
    user.require(Maintenance::DESCRIPTOR.policy.update)?;
    let mut task = resource::load_owned::<Maintenance>(&state, &user, parse_id(&id)?).await?;
    resource::ensure_reference::<User>(&state, &user, req.assigned_to, "assignedTo").await?;

    task.assign(req.assigned_to);
    let data = resource::save(&state, &task).await?;
    notify_assignee(&state, &task).await;

    Ok(resource::updated(data, "Tugas pemeliharaan berhasil ditugaskan"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::soft_delete::<Maintenance>(&state, &user, parse_id(&id)?).await?;
    Ok(resource::deleted("Tugas pemeliharaan berhasil dihapus"))
}
