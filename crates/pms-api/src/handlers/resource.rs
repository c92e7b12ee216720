// ============================================================================
// PMS API - Generic Resource Operations
// File: crates/pms-api/src/handlers/resource.rs
// ============================================================================
//! List, detail, stats and soft-delete implemented once over
//! `E: Entity`, plus the persistence helpers the per-entity handlers share.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use pms_core::attachment::{self, AttachmentPolicy};
use pms_core::cache::keys;
use pms_core::domain::{Role, User};
use pms_core::notification::{recipients_with_roles, Notification, Recipient, Template};
use pms_core::query::filter::lookup;
use pms_core::query::{ListQuery, Scope};
use pms_core::validation::FieldError;
use pms_core::Entity;

use crate::error::ApiError;
use crate::extractors::Payload;
use crate::middleware::AuthUser;
use crate::response::{raw_json, ApiResponse};
use crate::state::AppState;

pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest("ID tidak valid".to_string()))
}

/// Tenant scope, narrowed to the caller's own documents for residents
/// where the entity declares an owner path
pub fn scope<E: Entity>(user: &AuthUser) -> Scope {
    let scope = Scope::tenant(user.tenant_id, user.role);
    match (user.role, E::DESCRIPTOR.policy.resident_owner_path) {
        (Role::Resident, Some(path)) => scope.with_constraint(path, user.id),
        _ => scope,
    }
}

/// Ownership check against a public (possibly cached) document
pub fn ensure_access<E: Entity>(user: &AuthUser, doc: &Value) -> Result<(), ApiError> {
    let desc = E::DESCRIPTOR;
    let tenant = user.tenant_id.to_string();
    if lookup(doc, desc.owner_path).and_then(Value::as_str) != Some(tenant.as_str()) {
        warn!(user_id = %user.id, collection = desc.collection, "cross-tenant access rejected");
        return Err(ApiError::forbidden());
    }

    if let (Role::Resident, Some(path)) = (user.role, desc.policy.resident_owner_path) {
        let me = user.id.to_string();
        if lookup(doc, path).and_then(Value::as_str) != Some(me.as_str()) {
            warn!(user_id = %user.id, collection = desc.collection, "resident access to foreign document rejected");
            return Err(ApiError::forbidden());
        }
    }
    Ok(())
}

pub fn ensure_owned<E: Entity>(user: &AuthUser, entity: &E) -> Result<(), ApiError> {
    let doc = serde_json::to_value(entity).map_err(|e| ApiError::Internal(e.to_string()))?;
    ensure_access::<E>(user, &doc)
}

pub async fn list<E: Entity>(
    state: &AppState,
    user: &AuthUser,
    params: HashMap<String, String>,
) -> Result<Response, ApiError> {
    user.require(E::DESCRIPTOR.policy.read)?;

    let query = ListQuery::from_params(&params);
    let scope = scope::<E>(user);
    let key = keys::list_key(E::DESCRIPTOR.collection, &scope, &query);
    let repo = state.repo::<E>();

    let body = state
        .cache
        .get_or_load(&key, state.cache.ttl.list, || async move {
            let page = repo.list(&query, &scope).await?;
            Ok(serde_json::to_string(&ApiResponse::page(page))?)
        })
        .await?;
    Ok(raw_json(StatusCode::OK, body))
}

/// Role gate from the descriptor, then [`cached_detail`]
pub async fn detail<E: Entity>(state: &AppState, user: &AuthUser, id: Uuid) -> Result<Response, ApiError> {
    user.require(E::DESCRIPTOR.policy.detail)?;
    cached_detail::<E>(state, user, id).await
}

/// Cache-aside single read. Hits are still checked for ownership using the
/// owner fields in the cached body.
pub async fn cached_detail<E: Entity>(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> Result<Response, ApiError> {
    let key = keys::detail_key(E::DESCRIPTOR.collection, id);
    let repo = state.repo::<E>();

    let body = state
        .cache
        .get_or_load(&key, state.cache.ttl.detail, || async move {
            let entity = repo.find_active(id).await?;
            let doc = repo.detail(&entity).await?;
            Ok(serde_json::to_string(&ApiResponse::success(doc))?)
        })
        .await?;

    let envelope: Value =
        serde_json::from_str(&body).map_err(|e| ApiError::Internal(e.to_string()))?;
    ensure_access::<E>(user, &envelope["data"])?;
    Ok(raw_json(StatusCode::OK, body))
}

pub async fn stats<E: Entity>(state: &AppState, user: &AuthUser) -> Result<Response, ApiError> {
    user.require(E::DESCRIPTOR.policy.stats)?;

    let tenant_id = user.tenant_id;
    let key = keys::stats_key(E::DESCRIPTOR.collection, tenant_id);
    let repo = state.repo::<E>();

    let body = state
        .cache
        .get_or_load(&key, state.cache.ttl.stats, || async move {
            let stats = repo.stats(tenant_id).await?;
            Ok(serde_json::to_string(&ApiResponse::success(stats))?)
        })
        .await?;
    Ok(raw_json(StatusCode::OK, body))
}

/// Active entity owned by the caller's tenant
pub async fn load_owned<E: Entity>(state: &AppState, user: &AuthUser, id: Uuid) -> Result<E, ApiError> {
    let entity = state.repo::<E>().find_active(id).await?;
    ensure_owned(user, &entity)?;
    Ok(entity)
}

/// Referenced document for a create/update; unknown ids are field errors,
/// other tenants' documents are forbidden
pub async fn ensure_reference<E: Entity>(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    field: &str,
) -> Result<E, ApiError> {
    match state.repo::<E>().find(id).await? {
        Some(entity) if entity.is_active() => {
            if entity.tenant_id() != user.tenant_id {
                warn!(user_id = %user.id, field, "reference to another tenant rejected");
                return Err(ApiError::forbidden());
            }
            Ok(entity)
        }
        _ => Err(ApiError::Validation(vec![FieldError::new(
            field,
            format!("{} tidak ditemukan", E::DESCRIPTOR.label),
        )])),
    }
}

pub async fn insert<E: Entity>(state: &AppState, entity: &E) -> Result<Value, ApiError> {
    let repo = state.repo::<E>();
    repo.insert(entity).await?;
    state
        .cache
        .invalidate(E::DESCRIPTOR.collection, None, entity.tenant_id())
        .await;
    info!(collection = E::DESCRIPTOR.collection, id = %entity.id(), "document created");
    Ok(repo.detail(entity).await?)
}

pub async fn save<E: Entity>(state: &AppState, entity: &E) -> Result<Value, ApiError> {
    let repo = state.repo::<E>();
    repo.save(entity).await?;
    state
        .cache
        .invalidate(E::DESCRIPTOR.collection, Some(entity.id()), entity.tenant_id())
        .await;
    info!(collection = E::DESCRIPTOR.collection, id = %entity.id(), "document updated");
    Ok(repo.detail(entity).await?)
}

/// Flip `isActive`, tell the tenant's management, then drop cached copies.
/// Documents are never removed.
pub async fn soft_delete<E: Entity>(state: &AppState, user: &AuthUser, id: Uuid) -> Result<E, ApiError> {
    soft_delete_with(state, user, id, |_| Vec::new()).await
}

/// [`soft_delete`] with extra notifications built from the removed entity
pub async fn soft_delete_with<E, F>(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    extra: F,
) -> Result<E, ApiError>
where
    E: Entity,
    F: FnOnce(&E) -> Vec<Notification>,
{
    user.require(E::DESCRIPTOR.policy.delete)?;
    let mut entity = load_owned::<E>(state, user, id).await?;
    entity.deactivate();

    state.repo::<E>().save(&entity).await?;
    info!(collection = E::DESCRIPTOR.collection, id = %id, by = %user.id, "document deactivated");

    let mut notifications = removal_notices(state, user, &entity).await;
    notifications.extend(extra(&entity));
    notify(state, notifications).await;

    state
        .cache
        .invalidate(E::DESCRIPTOR.collection, Some(id), entity.tenant_id())
        .await;
    Ok(entity)
}

const TITLE_FIELDS: &[&str] = &["title", "name", "unitNumber", "code"];

/// Admins and managers of the owning tenant, the actor excluded
async fn removal_notices<E: Entity>(state: &AppState, user: &AuthUser, entity: &E) -> Vec<Notification> {
    let doc = serde_json::to_value(entity).unwrap_or(Value::Null);
    let title = TITLE_FIELDS
        .iter()
        .find_map(|field| doc.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| entity.id().to_string());

    let recipients = staff_with_roles(state, entity.tenant_id(), &[Role::Admin, Role::Manager])
        .await
        .into_iter()
        .filter(|r| r.email != user.email)
        .collect();
    Notification::fan_out(
        recipients,
        Template::RecordRemoved,
        json!({
            "entity": E::DESCRIPTOR.label,
            "title": title,
            "removedBy": user.name,
        }),
    )
}

pub async fn store_files(
    state: &AppState,
    payload: &Payload,
    policy: AttachmentPolicy,
) -> Result<Vec<String>, ApiError> {
    Ok(attachment::store_all(state.storage.as_ref(), &payload.files, policy).await?)
}

/// Pass `result` through; on failure the files stored for it are removed
pub async fn discard_on_error<T>(
    state: &AppState,
    paths: &[String],
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    if result.is_err() {
        attachment::discard(state.storage.as_ref(), paths).await;
    }
    result
}

pub async fn notify(state: &AppState, notifications: Vec<Notification>) {
    state.dispatcher.dispatch(notifications).await;
}

pub async fn staff_with_roles(state: &AppState, tenant_id: Uuid, roles: &[Role]) -> Vec<Recipient> {
    recipients_with_roles(&state.repo::<User>(), tenant_id, roles).await
}

pub async fn recipient(state: &AppState, user_id: Uuid) -> Option<Recipient> {
    pms_core::notification::recipients::recipient_for(&state.repo::<User>(), user_id).await
}

pub fn created<T: Serialize>(data: T, message: &str) -> Response {
    ApiResponse::with_message(data, message).into_response_with(StatusCode::CREATED)
}

pub fn updated<T: Serialize>(data: T, message: &str) -> Response {
    ApiResponse::with_message(data, message).into_response_with(StatusCode::OK)
}

pub fn deleted(message: &str) -> Response {
    ApiResponse::message(message).into_response_with(StatusCode::OK)
}
