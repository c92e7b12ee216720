//! Unit handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use uuid::Uuid;

use pms_core::attachment::UNIT_IMAGES;
use pms_core::domain::common::OPERATIONS;
use pms_core::domain::unit::{CreateUnitRequest, UnitStatusRequest, UpdateUnitRequest};
use pms_core::domain::{Property, Unit, User};
use pms_core::query::Filter;
use pms_core::validation::FieldError;
use pms_core::Entity;

use super::resource::{self, parse_id};
use crate::error::ApiError;
use crate::extractors::{Payload, ValidJson};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Unit numbers are unique per property among active units
async fn ensure_number_free(
    state: &AppState,
    property_id: Uuid,
    unit_number: &str,
    except: Option<Uuid>,
) -> Result<(), ApiError> {
    let existing = state
        .repo::<Unit>()
        .find_one(Filter::and(vec![
            Filter::eq("propertyId", property_id.to_string()),
            Filter::eq("unitNumber", unit_number.trim()),
            Filter::eq("isActive", true),
        ]))
        .await?;
    match existing {
        Some(unit) if Some(unit.id) != except => Err(ApiError::Validation(vec![FieldError::new(
            "unitNumber",
            "Nomor unit sudah digunakan di properti ini",
        )])),
        _ => Ok(()),
    }
}

async fn ensure_occupant(state: &AppState, user: &AuthUser, occupant: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(occupant) = occupant {
        resource::ensure_reference::<User>(state, user, occupant, "currentOccupant").await?;
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    resource::list::<Unit>(&state, &user, params).await
}

pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    resource::stats::<Unit>(&state, &user).await
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::detail::<Unit>(&state, &user, parse_id(&id)?).await
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Unit::DESCRIPTOR.policy.create)?;
    let req: CreateUnitRequest = payload.parse()?;

    resource::ensure_reference::<Property>(&state, &user, req.property_id, "propertyId").await?;
    ensure_occupant(&state, &user, req.current_occupant).await?;
    ensure_number_free(&state, req.property_id, &req.unit_number, None).await?;

    let images = resource::store_files(&state, &payload, UNIT_IMAGES).await?;
    let unit = Unit::new(user.tenant_id, req, images.clone());
    let data =
        resource::discard_on_error(&state, &images, resource::insert(&state, &unit).await).await?;
    Ok(resource::created(data, "Unit berhasil dibuat"))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Unit::DESCRIPTOR.policy.update)?;
    let req: UpdateUnitRequest = payload.parse()?;
    let mut unit = resource::load_owned::<Unit>(&state, &user, parse_id(&id)?).await?;

    if let Some(number) = &req.unit_number {
        ensure_number_free(&state, unit.property_id, number, Some(unit.id)).await?;
    }
    ensure_occupant(&state, &user, req.current_occupant).await?;

    let images = resource::store_files(&state, &payload, UNIT_IMAGES).await?;
    let result = match unit.apply(req, images.clone()) {
        Ok(()) => resource::save(&state, &unit).await,
        Err(e) => Err(e.into()),
    };
    let data = resource::discard_on_error(&state, &images, result).await?;
    Ok(resource::updated(data, "Unit berhasil diperbarui"))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UnitStatusRequest>,
) -> Result<Response, ApiError> {
    user.require(OPERATIONS)?;
    let mut unit = resource::load_owned::<Unit>(&state, &user, parse_id(&id)?).await?;
    ensure_occupant(&state, &user, req.current_occupant).await?;

    unit.set_status(req.status, req.current_occupant)?;
    let data = resource::save(&state, &unit).await?;
    Ok(resource::updated(data, "Status unit berhasil diperbarui"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::soft_delete::<Unit>(&state, &user, parse_id(&id)?).await?;
    Ok(resource::deleted("Unit berhasil dihapus"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{png, TestApp};

    #[tokio::test]
    async fn test_multipart_fields_follow_field_types() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let property = app.create_property(&seeded.admin_token, "Menteng Residence").await;

        let (status, body) = app
            .multipart(
                Method::POST,
                "/api/units",
                &seeded.admin_token,
                &[
                    ("propertyId", property.as_str()),
                    ("unitNumber", "101"),
                    ("type", "studio"),
                    ("rent", "1000"),
                    ("floor", "1"),
                    ("description", ""),
                ],
                &[],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["data"]["unitNumber"], "101");
        assert_eq!(body["data"]["rent"], 1000.0);
        assert_eq!(body["data"]["floor"], 1);
        assert!(body["data"]["description"].is_null());

        let (status, body) = app
            .multipart(
                Method::POST,
                "/api/units",
                &seeded.admin_token,
                &[
                    ("propertyId", property.as_str()),
                    ("unitNumber", "102"),
                    ("type", "studio"),
                    ("rent", "murah"),
                ],
                &[],
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_unit_number_unique_per_property() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let menteng = app.create_property(&seeded.admin_token, "Menteng Residence").await;
        let kemang = app.create_property(&seeded.admin_token, "Kemang Villa").await;
        app.create_unit(&seeded.admin_token, &menteng, "A-101").await;
        app.create_unit(&seeded.admin_token, &kemang, "A-101").await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/units",
                Some(&seeded.admin_token),
                Some(json!({ "propertyId": menteng, "unitNumber": "A-101", "type": "studio", "rent": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "unitNumber");
    }

    #[tokio::test]
    async fn test_unknown_and_foreign_property_references() {
        let app = TestApp::new();
        let acme = app.onboard("acme").await;
        let globex = app.onboard("globex").await;
        let foreign = app.create_property(&globex.admin_token, "Globex Tower").await;

        let body = |property: &str| {
            json!({ "propertyId": property, "unitNumber": "B-1", "type": "studio", "rent": 1 })
        };
        let (status, missing) = app
            .json(
                Method::POST,
                "/api/units",
                Some(&acme.admin_token),
                Some(body(&uuid::Uuid::new_v4().to_string())),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(missing["errors"][0]["field"], "propertyId");

        let (status, _) = app
            .json(Method::POST, "/api/units", Some(&acme.admin_token), Some(body(&foreign)))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_staff_sets_occupancy() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let property = app.create_property(&seeded.admin_token, "Menteng Residence").await;
        let unit = app.create_unit(&seeded.admin_token, &property, "A-101").await;
        let (resident_id, resident) =
            app.add_user(&seeded.admin_token, "warga@acme.test", "resident").await;
        let (_, staff) = app.add_user(&seeded.admin_token, "staf@acme.test", "staff").await;
        let uri = format!("/api/units/{}/status", unit);

        let (status, body) = app
            .json(Method::PATCH, &uri, Some(&staff), Some(json!({ "status": "occupied" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "currentOccupant");

        let (status, body) = app
            .json(
                Method::PATCH,
                &uri,
                Some(&staff),
                Some(json!({ "status": "occupied", "currentOccupant": resident_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["currentOccupant"], resident_id.as_str());

        let (status, _) = app
            .json(Method::PATCH, &uri, Some(&resident), Some(json!({ "status": "available" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, stats) = app.json(Method::GET, "/api/units/stats", Some(&staff), None).await;
        assert_eq!(stats["data"]["byStatus"]["occupied"], 1);
    }

    #[tokio::test]
    async fn test_failed_update_removes_uploaded_images() {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let property = app.create_property(&seeded.admin_token, "Menteng Residence").await;
        let unit = app.create_unit(&seeded.admin_token, &property, "101").await;

        let (status, body) = app
            .multipart(
                Method::PUT,
                &format!("/api/units/{unit}"),
                &seeded.admin_token,
                &[("status", "occupied")],
                &[("images", "kamar.png", png(40, 40))],
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["errors"][0]["field"], "currentOccupant");
        assert_eq!(app.stored_files(), 0);

        let (status, body) = app
            .json(Method::GET, &format!("/api/units/{unit}"), Some(&seeded.admin_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["images"], json!([]));
    }
}
