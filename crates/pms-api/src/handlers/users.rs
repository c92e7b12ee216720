//! User management handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::{json, Value};
use tracing::warn;

use pms_core::attachment::AVATAR;
use pms_core::domain::common::clean_text;
use pms_core::domain::user::{CreateUserRequest, UpdateUserRequest};
use pms_core::domain::{Role, Tenant, Unit, User};
use pms_core::notification::{Notification, Recipient, Template};
use pms_core::validation::FieldError;
use pms_core::Entity;
use pms_security::PasswordService;

use super::resource::{self, parse_id};
use crate::error::ApiError;
use crate::extractors::{Payload, ValidJson};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Admins may act on anyone in their tenant, everyone else only on themselves
fn require_self_or_admin(user: &AuthUser, target: uuid::Uuid) -> Result<(), ApiError> {
    if user.id == target || user.role == Role::Admin {
        Ok(())
    } else {
        warn!(user_id = %user.id, target = %target, "user update on another account rejected");
        Err(ApiError::forbidden())
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    resource::list::<User>(&state, &user, params).await
}

pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    resource::stats::<User>(&state, &user).await
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    if id == user.id {
        return resource::cached_detail::<User>(&state, &user, id).await;
    }
    resource::detail::<User>(&state, &user, id).await
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> Result<Response, ApiError> {
    user.require(User::DESCRIPTOR.policy.create)?;

    if state.auth.find_by_email(&req.email).await?.is_some() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "email",
            "Email sudah terdaftar",
        )]));
    }
    if let Some(unit_id) = req.unit_id {
        resource::ensure_reference::<Unit>(&state, &user, unit_id, "unitId").await?;
    }

    let hash = PasswordService::hash(&req.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let mut created = User::new(user.tenant_id, req.name, &req.email, hash, req.role);
    created.phone = clean_text(req.phone);
    created.unit_id = req.unit_id;
    let data = resource::insert(&state, &created).await?;

    let tenant_name = state
        .repo::<Tenant>()
        .find(user.tenant_id)
        .await?
        .map(|t| t.name)
        .unwrap_or_default();
    resource::notify(
        &state,
        vec![Notification::new(
            Recipient::account(&created),
            Template::Welcome,
            json!({ "tenant": tenant_name }),
        )],
    )
    .await;

    Ok(resource::created(data, "User berhasil dibuat"))
}

/// Admins may change role, unit and status; users may edit their own
/// profile fields only
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    require_self_or_admin(&user, id)?;
    if user.role != Role::Admin && req.touches_admin_fields() {
        return Err(ApiError::Forbidden(
            "Hanya admin yang dapat mengubah role, unit, atau status".to_string(),
        ));
    }

    let mut target = resource::load_owned::<User>(&state, &user, id).await?;
    if user.role == Role::Admin {
        if let Some(unit_id) = req.unit_id {
            resource::ensure_reference::<Unit>(&state, &user, unit_id, "unitId").await?;
        }
        target.apply_admin(&req);
    } else {
        target.apply_profile(&req);
    }

    let data = resource::save(&state, &target).await?;
    Ok(resource::updated(data, "User berhasil diperbarui"))
}

/// Deep-merges the body into `preferences`
pub async fn update_preferences(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    require_self_or_admin(&user, id)?;
    let Value::Object(_) = payload.body else {
        return Err(ApiError::BadRequest("Preferensi harus berupa objek".to_string()));
    };

    let mut target = resource::load_owned::<User>(&state, &user, id).await?;
    target.merge_preferences(payload.body);
    let data = resource::save(&state, &target).await?;
    Ok(resource::updated(data, "Preferensi berhasil diperbarui"))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    require_self_or_admin(&user, id)?;
    if !payload.has_file(AVATAR.field) {
        return Err(ApiError::Validation(vec![FieldError::new(
            AVATAR.field,
            "File avatar wajib diunggah",
        )]));
    }

    let mut target = resource::load_owned::<User>(&state, &user, id).await?;
    let avatar = resource::store_files(&state, &payload, AVATAR).await?;
    target.avatar = avatar.first().cloned();
    target.touch();
    let data = resource::discard_on_error(&state, &avatar, resource::save(&state, &target).await).await?;
    Ok(resource::updated(data, "Avatar berhasil diperbarui"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    user.require(User::DESCRIPTOR.policy.delete)?;
    if id == user.id {
        return Err(ApiError::BadRequest(
            "Tidak dapat menonaktifkan akun sendiri".to_string(),
        ));
    }

    resource::soft_delete_with::<User, _>(&state, &user, id, |removed| {
        vec![Notification::new(
            Recipient::account(removed),
            Template::AccountDeactivated,
            json!({}),
        )]
    })
    .await?;
    Ok(resource::deleted("User berhasil dinonaktifkan"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{png, TestApp, PASSWORD};

    #[tokio::test]
    async fn test_admin_creates_user_and_welcome_is_sent() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;

        let (id, _) = app.add_user(&seeded.admin_token, "Staf@Acme.test", "staff").await;
        assert!(!id.is_empty());
        let welcome = app.mailer.sent_to("staf@acme.test");
        assert_eq!(welcome.len(), 1);
        assert!(welcome[0].html.contains("Tenant acme"));

        let (status, body) = app
            .json(
                Method::POST,
                "/api/users",
                Some(&seeded.admin_token),
                Some(json!({ "name": "Lagi", "email": "staf@acme.test", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "email");

        let (_, stats) = app
            .json(Method::GET, "/api/users/stats", Some(&seeded.admin_token), None)
            .await;
        assert_eq!(stats["data"]["totalUsers"], 2);
        assert_eq!(stats["data"]["byRole"]["staff"], 1);
    }

    #[tokio::test]
    async fn test_self_service_limits() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let (resident_id, resident) =
            app.add_user(&seeded.admin_token, "warga@acme.test", "resident").await;
        let (other_id, _) = app.add_user(&seeded.admin_token, "lain@acme.test", "resident").await;
        let own = format!("/api/users/{}", resident_id);

        let (status, me) = app.json(Method::GET, &own, Some(&resident), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(me["data"].get("passwordHash").is_none());

        let (status, _) = app
            .json(Method::GET, &format!("/api/users/{}", other_id), Some(&resident), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.json(Method::GET, "/api/users", Some(&resident), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, updated) = app
            .json(
                Method::PUT,
                &own,
                Some(&resident),
                Some(json!({ "name": "Warga Baru", "phone": "08123456789" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["data"]["name"], "Warga Baru");

        let (status, _) = app
            .json(Method::PUT, &own, Some(&resident), Some(json!({ "role": "admin" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, prefs) = app
            .json(
                Method::PATCH,
                &format!("{}/preferences", own),
                Some(&resident),
                Some(json!({ "notifications": { "email": false }, "language": "id" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(prefs["data"]["preferences"]["notifications"]["email"], false);
        assert_eq!(prefs["data"]["preferences"]["language"], "id");

        let (status, _) = app
            .json(
                Method::PATCH,
                &format!("/api/users/{}/preferences", other_id),
                Some(&resident),
                Some(json!({ "language": "en" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_avatar_upload_requires_file() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let uri = format!("/api/users/{}/avatar", seeded.admin_id);

        let (status, body) = app
            .multipart(Method::POST, &uri, &seeded.admin_token, &[("note", "x")], &[])
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "avatar");

        let (status, body) = app
            .multipart(
                Method::POST,
                &uri,
                &seeded.admin_token,
                &[],
                &[("avatar", "me.png", png(64, 64))],
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["data"]["avatar"].as_str().unwrap().starts_with("/uploads/"));
    }

    #[tokio::test]
    async fn test_deactivation_blocks_access() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let (staff_id, staff) = app.add_user(&seeded.admin_token, "staf@acme.test", "staff").await;

        let (status, _) = app
            .json(
                Method::DELETE,
                &format!("/api/users/{}", seeded.admin_id),
                Some(&seeded.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json(
                Method::DELETE,
                &format!("/api/users/{}", staff_id),
                Some(&seeded.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(app
            .mailer
            .sent_to("staf@acme.test")
            .iter()
            .any(|m| m.template == pms_core::notification::Template::AccountDeactivated));

        let (status, _) = app.json(Method::GET, "/api/auth/me", Some(&staff), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "staf@acme.test", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
