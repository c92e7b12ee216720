//! Tenant handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::json;
use tracing::info;

use pms_core::attachment::TENANT_LOGO;
use pms_core::domain::common::ADMIN_ONLY;
use pms_core::domain::tenant::{OnboardTenantRequest, UpdateSubscriptionRequest, UpdateTenantRequest};
use pms_core::domain::{Tenant, User};
use pms_core::notification::{Notification, Template};
use pms_core::query::Filter;
use pms_core::Entity;

use super::resource::{self, parse_id};
use crate::error::ApiError;
use crate::extractors::{Payload, ValidJson};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Public: creates a tenant together with its first administrator
pub async fn onboard(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<OnboardTenantRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.auth.onboard(req).await?;

    state
        .cache
        .invalidate(Tenant::DESCRIPTOR.collection, None, outcome.tenant.id)
        .await;
    state
        .cache
        .invalidate(User::DESCRIPTOR.collection, None, outcome.tenant.id)
        .await;
    resource::notify(&state, outcome.notifications).await;

    let data = json!({
        "tenant": state.repo::<Tenant>().to_public(&outcome.tenant)?,
        "user": state.repo::<User>().to_public(&outcome.admin)?,
        "token": outcome.token,
    });
    Ok(resource::created(data, "Tenant berhasil didaftarkan"))
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    resource::list::<Tenant>(&state, &user, params).await
}

pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    resource::stats::<Tenant>(&state, &user).await
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::detail::<Tenant>(&state, &user, parse_id(&id)?).await
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Tenant::DESCRIPTOR.policy.update)?;
    let req: UpdateTenantRequest = payload.parse()?;
    let mut tenant = resource::load_owned::<Tenant>(&state, &user, parse_id(&id)?).await?;

    let logo = resource::store_files(&state, &payload, TENANT_LOGO).await?;
    tenant.apply(req);
    if let Some(path) = logo.first() {
        tenant.logo = Some(path.clone());
    }
    let data = resource::discard_on_error(&state, &logo, resource::save(&state, &tenant).await).await?;
    Ok(resource::updated(data, "Tenant berhasil diperbarui"))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateSubscriptionRequest>,
) -> Result<Response, ApiError> {
    user.require(Tenant::DESCRIPTOR.policy.update)?;
    let mut tenant = resource::load_owned::<Tenant>(&state, &user, parse_id(&id)?).await?;

    tenant.update_subscription(req);
    let data = resource::save(&state, &tenant).await?;

    let recipients = resource::staff_with_roles(&state, tenant.id, ADMIN_ONLY).await;
    resource::notify(
        &state,
        Notification::fan_out(
            recipients,
            Template::SubscriptionUpdated,
            json!({
                "tenant": tenant.name,
                "plan": tenant.subscription.plan,
                "status": tenant.subscription.status,
            }),
        ),
    )
    .await;

    Ok(resource::updated(data, "Langganan berhasil diperbarui"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let tenant = resource::soft_delete::<Tenant>(&state, &user, parse_id(&id)?).await?;
    deactivate_members(&state, &tenant).await?;
    Ok(resource::deleted("Tenant berhasil dihapus"))
}

/// A removed tenant takes its accounts with it
async fn deactivate_members(state: &AppState, tenant: &Tenant) -> Result<(), ApiError> {
    let repo = state.repo::<User>();
    let members = repo
        .find_all(Filter::and(vec![
            Filter::eq("tenantId", tenant.id.to_string()),
            Filter::eq("isActive", true),
        ]))
        .await?;

    for mut member in members {
        member.deactivate();
        repo.save(&member).await?;
        state
            .cache
            .invalidate(User::DESCRIPTOR.collection, Some(member.id), tenant.id)
            .await;
    }
    info!(tenant_id = %tenant.id, "tenant accounts deactivated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{TestApp, PASSWORD};

    #[tokio::test]
    async fn test_onboarding_rejects_duplicate_code() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        assert!(!seeded.tenant_id.is_empty());

        let (status, body) = app
            .json(
                Method::POST,
                "/api/tenants/onboard",
                None,
                Some(json!({
                    "name": "Acme Lagi",
                    "code": "ACME",
                    "contact": { "email": "lain@acme.test" },
                    "admin": { "name": "Admin Dua", "email": "dua@acme.test", "password": PASSWORD }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "code");
    }

    #[tokio::test]
    async fn test_admin_sees_own_tenant_only() {
        let app = TestApp::new();
        let acme = app.onboard("acme").await;
        let globex = app.onboard("globex").await;

        let (status, own) = app
            .json(
                Method::GET,
                &format!("/api/tenants/{}", acme.tenant_id),
                Some(&acme.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(own["data"]["code"], "ACME");

        let (status, _) = app
            .json(
                Method::GET,
                &format!("/api/tenants/{}", globex.tenant_id),
                Some(&acme.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, list) = app.json(Method::GET, "/api/tenants", Some(&acme.admin_token), None).await;
        assert_eq!(list["count"], 1);
    }

    #[tokio::test]
    async fn test_subscription_change_notifies_admins() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let uri = format!("/api/tenants/{}/subscription", seeded.tenant_id);

        let (status, _) = app
            .json(Method::PATCH, &uri, Some(&seeded.admin_token), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .json(
                Method::PATCH,
                &uri,
                Some(&seeded.admin_token),
                Some(json!({ "plan": "premium", "status": "active" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["subscription"]["plan"], "premium");
        assert!(app
            .mailer
            .sent_to("admin@acme.test")
            .iter()
            .any(|m| m.html.contains("premium")));

        let (_, stats) = app
            .json(Method::GET, "/api/tenants/stats", Some(&seeded.admin_token), None)
            .await;
        assert_eq!(stats["data"]["byPlan"]["premium"], 1);
    }

    #[tokio::test]
    async fn test_manager_cannot_update_tenant() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let (_, manager) = app.add_user(&seeded.admin_token, "manajer@acme.test", "manager").await;
        let uri = format!("/api/tenants/{}", seeded.tenant_id);

        let (status, _) = app.json(Method::GET, &uri, Some(&manager), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .json(Method::PUT, &uri, Some(&manager), Some(json!({ "name": "Diambil Alih" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_deleted_tenant_takes_accounts_with_it() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        app.add_user(&seeded.admin_token, "manajer@acme.test", "manager").await;
        let uri = format!("/api/tenants/{}", seeded.tenant_id);

        let (status, _) = app
            .json(Method::DELETE, &uri, Some(&seeded.admin_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(app
            .mailer
            .sent_to("manajer@acme.test")
            .iter()
            .any(|m| m.subject == "Data dihapus"));

        for email in ["admin@acme.test", "manajer@acme.test"] {
            let (status, _) = app
                .json(
                    Method::POST,
                    "/api/auth/login",
                    None,
                    Some(json!({ "email": email, "password": PASSWORD })),
                )
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{email}");
        }

        let (status, _) = app
            .json(Method::GET, "/api/auth/me", Some(&seeded.admin_token), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
