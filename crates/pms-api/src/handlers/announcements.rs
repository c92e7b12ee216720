//! Announcement handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::json;

use pms_core::attachment::ANNOUNCEMENT_ATTACHMENTS;
use pms_core::domain::announcement::{CreateAnnouncementRequest, UpdateAnnouncementRequest};
use pms_core::domain::common::{ALL_ROLES, MANAGEMENT};
use pms_core::domain::{Announcement, Audience, Property, Role};
use pms_core::notification::{Notification, Template};
use pms_core::Entity;

use super::resource::{self, parse_id};
use crate::error::ApiError;
use crate::extractors::Payload;
use crate::middleware::AuthUser;
use crate::state::AppState;

fn audience_roles(audience: Audience) -> &'static [Role] {
    match audience {
        Audience::All => ALL_ROLES,
        Audience::Residents => &[Role::Resident],
        Audience::Staff => &[Role::Staff],
        Audience::Managers => MANAGEMENT,
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    resource::list::<Announcement>(&state, &user, params).await
}

pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    resource::stats::<Announcement>(&state, &user).await
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::detail::<Announcement>(&state, &user, parse_id(&id)?).await
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Announcement::DESCRIPTOR.policy.create)?;
    let req: CreateAnnouncementRequest = payload.parse()?;
    resource::ensure_reference::<Property>(&state, &user, req.property_id, "propertyId").await?;

    let attachments = resource::store_files(&state, &payload, ANNOUNCEMENT_ATTACHMENTS).await?;
    let announcement = Announcement::new(user.tenant_id, user.id, req, attachments.clone());
    let data =
        resource::discard_on_error(&state, &attachments, resource::insert(&state, &announcement).await).await?;

    let recipients = resource::staff_with_roles(
        &state,
        user.tenant_id,
        audience_roles(announcement.audience),
    )
    .await;
    resource::notify(
        &state,
        Notification::fan_out(
            recipients,
            Template::AnnouncementPublished,
            json!({
                "title": announcement.title,
                "content": announcement.content,
                "priority": announcement.priority,
            }),
        ),
    )
    .await;

    Ok(resource::created(data, "Pengumuman berhasil dibuat"))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Announcement::DESCRIPTOR.policy.update)?;
    let req: UpdateAnnouncementRequest = payload.parse()?;
    let mut announcement =
        resource::load_owned::<Announcement>(&state, &user, parse_id(&id)?).await?;

    let attachments = resource::store_files(&state, &payload, ANNOUNCEMENT_ATTACHMENTS).await?;
    announcement.apply(req, attachments.clone());
    let data =
        resource::discard_on_error(&state, &attachments, resource::save(&state, &announcement).await)
            .await?;
    Ok(resource::updated(data, "Pengumuman berhasil diperbarui"))
}

/// Records the caller's view once; repeated views change nothing
pub async fn view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    user.require(Announcement::DESCRIPTOR.policy.detail)?;
    let mut announcement =
        resource::load_owned::<Announcement>(&state, &user, parse_id(&id)?).await?;

    let data = if announcement.record_view(user.id) {
        resource::save(&state, &announcement).await?
    } else {
        state.repo::<Announcement>().detail(&announcement).await?
    };
    Ok(resource::updated(data, "Pengumuman telah dibaca"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::soft_delete::<Announcement>(&state, &user, parse_id(&id)?).await?;
    Ok(resource::deleted("Pengumuman berhasil dihapus"))
}
