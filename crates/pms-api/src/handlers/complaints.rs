//! Complaint handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::json;

use pms_core::attachment::COMPLAINT_ATTACHMENTS;
use pms_core::domain::common::MANAGEMENT;
use pms_core::domain::complaint::{
    CommentRequest, ComplaintStatusRequest, CreateComplaintRequest, FeedbackRequest,
};
use pms_core::domain::{Complaint, Property, Role, Unit, User};
use pms_core::notification::{Notification, Template};
use pms_core::validation::FieldError;
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
    resource::list::<Complaint>(&state, &user, params).await
}

pub async fn stats(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    resource::stats::<Complaint>(&state, &user).await
}

pub async fn detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::detail::<Complaint>(&state, &user, parse_id(&id)?).await
}

/// Residents file for themselves; staff may file on behalf of a resident
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Complaint::DESCRIPTOR.policy.create)?;
    let req: CreateComplaintRequest = payload.parse()?;

    resource::ensure_reference::<Property>(&state, &user, req.property_id, "propertyId").await?;
    let unit = resource::ensure_reference::<Unit>(&state, &user, req.unit_id, "unitId").await?;
    if unit.property_id != req.property_id {
        return Err(ApiError::Validation(vec![FieldError::new(
            "unitId",
            "Unit tidak berada di properti tersebut",
        )]));
    }

    let (resident_id, resident_name) = match (user.role, req.resident) {
        (Role::Resident, _) | (_, None) => (user.id, user.name.clone()),
        (_, Some(resident)) => {
            let resident = resource::ensure_reference::<User>(&state, &user, resident, "resident").await?;
            (resident.id, resident.name)
        }
    };

    let attachments = resource::store_files(&state, &payload, COMPLAINT_ATTACHMENTS).await?;
    let complaint = Complaint::new(user.tenant_id, resident_id, req, attachments.clone());
    let data =
        resource::discard_on_error(&state, &attachments, resource::insert(&state, &complaint).await).await?;

    let recipients = resource::staff_with_roles(&state, user.tenant_id, MANAGEMENT).await;
    resource::notify(
        &state,
        Notification::fan_out(
            recipients,
            Template::ComplaintCreated,
            json!({
                "title": complaint.title,
                "category": complaint.category,
                "priority": complaint.priority,
                "resident": resident_name,
            }),
        ),
    )
    .await;

    Ok(resource::created(data, "Keluhan berhasil dibuat"))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<ComplaintStatusRequest>,
) -> Result<Response, ApiError> {
    user.require(Complaint::DESCRIPTOR.policy.update)?;
    let mut complaint = resource::load_owned::<Complaint>(&state, &user, parse_id(&id)?).await?;

    let notes = req.notes.clone();
    complaint.change_status(req.status, user.id, req.notes)?;
    let data = resource::save(&state, &complaint).await?;

    if let Some(recipient) = resource::recipient(&state, complaint.resident).await {
        resource::notify(
            &state,
            vec![Notification::new(
                recipient,
                Template::ComplaintStatusChanged,
                json!({
                    "title": complaint.title,
                    "status": complaint.status.as_str(),
                    "notes": notes,
                }),
            )],
        )
        .await;
    }

    Ok(resource::updated(data, "Status keluhan berhasil diperbarui"))
}

/// Comments from staff notify the resident; comments from the resident
/// notify management
pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Response, ApiError> {
    user.require(Complaint::DESCRIPTOR.policy.detail)?;
    let req: CommentRequest = payload.parse()?;
    let mut complaint = resource::load_owned::<Complaint>(&state, &user, parse_id(&id)?).await?;

    let attachments = resource::store_files(&state, &payload, COMPLAINT_ATTACHMENTS).await?;
    let text = complaint.add_comment(user.id, req.text, attachments.clone()).text.clone();
    let data =
        resource::discard_on_error(&state, &attachments, resource::save(&state, &complaint).await)
            .await?;

    let recipients = if user.id == complaint.resident {
        resource::staff_with_roles(&state, user.tenant_id, MANAGEMENT).await
    } else {
        resource::recipient(&state, complaint.resident)
            .await
            .into_iter()
            .collect()
    };
    resource::notify(
        &state,
        Notification::fan_out(
            recipients,
            Template::ComplaintCommentAdded,
            json!({
                "title": complaint.title,
                "author": user.name,
                "comment": text,
            }),
        ),
    )
    .await;

    Ok(resource::created(data, "Komentar berhasil ditambahkan"))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<FeedbackRequest>,
) -> Result<Response, ApiError> {
    let mut complaint = resource::load_owned::<Complaint>(&state, &user, parse_id(&id)?).await?;
    if complaint.resident != user.id {
        return Err(ApiError::Forbidden(
            "Hanya pelapor yang dapat memberikan feedback".to_string(),
        ));
    }

    complaint.submit_feedback(req.rating, req.comment)?;
    let data = resource::save(&state, &complaint).await?;
    Ok(resource::updated(data, "Feedback berhasil dikirim"))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    resource::soft_delete::<Complaint>(&state, &user, parse_id(&id)?).await?;
    Ok(resource::deleted("Keluhan berhasil dihapus"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{Seeded, TestApp};

    struct Fixture {
        app: TestApp,
        seeded: Seeded,
        property: String,
        unit: String,
        resident_id: String,
        resident: String,
    }

    async fn fixture() -> Fixture {
        let app = TestApp::new();
        let seeded = app.onboard("acme").await;
        let property = app.create_property(&seeded.admin_token, "Menteng Residence").await;
        let unit = app.create_unit(&seeded.admin_token, &property, "A-101").await;
        let (resident_id, resident) =
            app.add_user(&seeded.admin_token, "warga@acme.test", "resident").await;
        Fixture {
            app,
            seeded,
            property,
            unit,
            resident_id,
            resident,
        }
    }

    async fn file_complaint(f: &Fixture, token: &str) -> String {
        let (status, body) = f
            .app
            .json(
                Method::POST,
                "/api/complaints",
                Some(token),
                Some(json!({
                    "propertyId": f.property,
                    "unitId": f.unit,
                    "title": "Air bocor",
                    "description": "Pipa di kamar mandi bocor sejak pagi.",
                    "category": "maintenance"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_residents_only_see_their_own() {
        let f = fixture().await;
        let (_, neighbour) = f
            .app
            .add_user(&f.seeded.admin_token, "tetangga@acme.test", "resident")
            .await;
        let id = file_complaint(&f, &f.resident).await;

        let (_, own) = f.app.json(Method::GET, "/api/complaints", Some(&f.resident), None).await;
        assert_eq!(own["count"], 1);
        assert_eq!(own["data"][0]["resident"], f.resident_id.as_str());

        let (_, other) = f.app.json(Method::GET, "/api/complaints", Some(&neighbour), None).await;
        assert_eq!(other["count"], 0);

        let uri = format!("/api/complaints/{}", id);
        let (status, _) = f.app.json(Method::GET, &uri, Some(&neighbour), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, all) = f
            .app
            .json(Method::GET, "/api/complaints", Some(&f.seeded.admin_token), None)
            .await;
        assert_eq!(all["count"], 1);
    }

    #[tokio::test]
    async fn test_unit_must_belong_to_property() {
        let f = fixture().await;
        let other_property = f
            .app
            .create_property(&f.seeded.admin_token, "Kemang Villa")
            .await;

        let (status, body) = f
            .app
            .json(
                Method::POST,
                "/api/complaints",
                Some(&f.resident),
                Some(json!({
                    "propertyId": other_property,
                    "unitId": f.unit,
                    "title": "Air bocor",
                    "description": "Pipa di kamar mandi bocor sejak pagi.",
                    "category": "maintenance"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "unitId");
    }

    #[tokio::test]
    async fn test_feedback_only_after_resolution_and_once() {
        let f = fixture().await;
        let id = file_complaint(&f, &f.resident).await;
        let feedback_uri = format!("/api/complaints/{}/feedback", id);
        let feedback = json!({ "rating": 5, "comment": "Cepat sekali" });

        let (status, _) = f
            .app
            .json(Method::POST, &feedback_uri, Some(&f.resident), Some(feedback.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, resolved) = f
            .app
            .json(
                Method::PATCH,
                &format!("/api/complaints/{}/status", id),
                Some(&f.seeded.admin_token),
                Some(json!({ "status": "resolved", "notes": "Pipa diganti" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{resolved}");
        assert_eq!(resolved["data"]["resolution"]["resolvedBy"], f.seeded.admin_id.as_str());
        assert!(!f.app.mailer.sent_to("warga@acme.test").is_empty());

        let (status, _) = f
            .app
            .json(Method::POST, &feedback_uri, Some(&f.seeded.admin_token), Some(feedback.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = f
            .app
            .json(Method::POST, &feedback_uri, Some(&f.resident), Some(feedback.clone()))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["feedback"]["rating"], 5);

        let (status, _) = f
            .app
            .json(Method::POST, &feedback_uri, Some(&f.resident), Some(feedback))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = f
            .app
            .json(
                Method::POST,
                &feedback_uri,
                Some(&f.resident),
                Some(json!({ "rating": 9 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_comment_from_resident_reaches_management() {
        let f = fixture().await;
        let id = file_complaint(&f, &f.resident).await;
        let before = f.app.mailer.sent_to("admin@acme.test").len();

        let (status, body) = f
            .app
            .json(
                Method::POST,
                &format!("/api/complaints/{}/comments", id),
                Some(&f.resident),
                Some(json!({ "text": "Masih bocor" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["comments"][0]["text"], "Masih bocor");
        assert_eq!(f.app.mailer.sent_to("admin@acme.test").len(), before + 1);
    }

    #[tokio::test]
    async fn test_resident_cannot_change_status() {
        let f = fixture().await;
        let id = file_complaint(&f, &f.resident).await;

        let (status, _) = f
            .app
            .json(
                Method::PATCH,
                &format!("/api/complaints/{}/status", id),
                Some(&f.resident),
                Some(json!({ "status": "closed" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
