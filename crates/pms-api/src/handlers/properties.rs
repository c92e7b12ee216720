//! Property handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::json;

use pms_core::attachment::PROPERTY_IMAGES;
use pms_core::domain::common::MANAGEMENT;
use pms_core::domain::property::{CreatePropertyRequest, UpdatePropertyRequest};
use pms_core::domain::Property;
use pms_core::notification::{Notification, Template};
use pms_core::Entity;

use super::resource::{self, parse_id};
use crate::error::ApiError;
use crate::extractors::Payload;
use crate::middleware::AuthUser;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    resource::list::<Property>(&state, &user, params).await
}

pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    resource::stats::<Property>(&state, &user).await
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::detail::<Property>(&state, &user, parse_id(&id)?).await
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Property::DESCRIPTOR.policy.create)?;
    let req: CreatePropertyRequest = payload.parse()?;

    let images = resource::store_files(&state, &payload, PROPERTY_IMAGES).await?;
    let property = Property::new(user.tenant_id, req, images.clone());
    let data =
        resource::discard_on_error(&state, &images, resource::insert(&state, &property).await).await?;

    let recipients = resource::staff_with_roles(&state, user.tenant_id, MANAGEMENT).await;
    resource::notify(
        &state,
        Notification::fan_out(
            recipients,
            Template::PropertyCreated,
            json!({ "property": property.name, "city": property.address.city }),
        ),
    )
    .await;

    Ok(resource::created(data, "Properti berhasil dibuat"))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Property::DESCRIPTOR.policy.update)?;
    let req: UpdatePropertyRequest = payload.parse()?;
    let mut property = resource::load_owned::<Property>(&state, &user, parse_id(&id)?).await?;

    let images = resource::store_files(&state, &payload, PROPERTY_IMAGES).await?;
    property.apply(req, images.clone());
    let data =
        resource::discard_on_error(&state, &images, resource::save(&state, &property).await).await?;
    Ok(resource::updated(data, "Properti berhasil diperbarui"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::soft_delete::<Property>(&state, &user, parse_id(&id)?).await?;
    Ok(resource::deleted("Properti berhasil dihapus"))
}
