//! Complaint domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{clean_text, Priority, ADMIN_ONLY, ALL_ROLES, OPERATIONS, PRIORITY_VALUES};
use crate::entity::{
    AccessPolicy, Distribution, Entity, EntityDescriptor, FieldKind, FilterField, Metric,
    MetricKind, Relation, StatsSpec,
};
use crate::error::DomainError;
use crate::tenant_scoped_entity;
use crate::validation::RequestSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintCategory {
    Maintenance,
    Noise,
    Security,
    Cleanliness,
    Parking,
    Billing,
    Other,
}

pub const COMPLAINT_CATEGORY_VALUES: &[&str] = &[
    "maintenance",
    "noise",
    "security",
    "cleanliness",
    "parking",
    "billing",
    "other",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

pub const COMPLAINT_STATUS_VALUES: &[&str] = &["open", "in_progress", "resolved", "closed"];

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Open => "open",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintComment {
    pub id: Uuid,
    pub author: Uuid,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub resolved_by: Uuid,
    pub resolved_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub rating: u8,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Uuid,
    pub resident: Uuid,
    pub title: String,
    pub description: String,
    pub category: ComplaintCategory,
    pub priority: Priority,
    pub status: ComplaintStatus,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub comments: Vec<ComplaintComment>,
    pub resolution: Option<Resolution>,
    pub feedback: Option<Feedback>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COMPLAINT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "complaints",
    label: "Keluhan",
    owner_path: "tenantId",
    search_fields: &["title", "description"],
    filters: &[
        FilterField::new("status", "status", FieldKind::Text),
        FilterField::new("category", "category", FieldKind::Text),
        FilterField::new("priority", "priority", FieldKind::Text),
        FilterField::new("propertyId", "propertyId", FieldKind::Uuid),
        FilterField::new("unitId", "unitId", FieldKind::Uuid),
        FilterField::new("resident", "resident", FieldKind::Uuid),
        FilterField::new("isActive", "isActive", FieldKind::Bool),
    ],
    relations: &[
        Relation {
            path: "propertyId",
            collection: "properties",
            alias: "property",
            select: &["name"],
        },
        Relation {
            path: "unitId",
            collection: "units",
            alias: "unit",
            select: &["unitNumber"],
        },
        Relation {
            path: "resident",
            collection: "users",
            alias: "residentInfo",
            select: &["name", "email"],
        },
    ],
    hidden_fields: &[],
    stats: StatsSpec {
        count_key: "totalComplaints",
        distributions: &[
            Distribution {
                key: "byStatus",
                path: "status",
                values: COMPLAINT_STATUS_VALUES,
            },
            Distribution {
                key: "byCategory",
                path: "category",
                values: COMPLAINT_CATEGORY_VALUES,
            },
            Distribution {
                key: "byPriority",
                path: "priority",
                values: PRIORITY_VALUES,
            },
        ],
        metrics: &[Metric {
            key: "averageRating",
            path: "feedback.rating",
            kind: MetricKind::Avg,
        }],
    },
    policy: AccessPolicy {
        read: ALL_ROLES,
        detail: ALL_ROLES,
        create: ALL_ROLES,
        update: OPERATIONS,
        delete: ADMIN_ONLY,
        stats: OPERATIONS,
        resident_owner_path: Some("resident"),
    },
};

tenant_scoped_entity!(Complaint, &COMPLAINT_DESCRIPTOR);

impl Complaint {
    pub fn new(
        tenant_id: Uuid,
        resident: Uuid,
        req: CreateComplaintRequest,
        attachments: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            property_id: req.property_id,
            unit_id: req.unit_id,
            resident,
            title: req.title.trim().to_string(),
            description: req.description,
            category: req.category,
            priority: req.priority,
            status: ComplaintStatus::Open,
            attachments,
            comments: Vec::new(),
            resolution: None,
            feedback: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Closed complaints are final. Moving to `resolved` records who resolved it.
    pub fn change_status(
        &mut self,
        status: ComplaintStatus,
        by: Uuid,
        notes: Option<String>,
    ) -> Result<(), DomainError> {
        if self.status == ComplaintStatus::Closed && status != ComplaintStatus::Closed {
            return Err(DomainError::InvalidState(
                "Keluhan yang sudah ditutup tidak dapat dibuka kembali".to_string(),
            ));
        }
        if status == ComplaintStatus::Resolved {
            self.resolution = Some(Resolution {
                resolved_by: by,
                resolved_at: Utc::now(),
                notes: clean_text(notes),
            });
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    pub fn add_comment(&mut self, author: Uuid, text: String, attachments: Vec<String>) -> &ComplaintComment {
        self.comments.push(ComplaintComment {
            id: Uuid::new_v4(),
            author,
            text: text.trim().to_string(),
            attachments,
            created_at: Utc::now(),
        });
        self.touch();
        &self.comments[self.comments.len() - 1]
    }

    pub fn submit_feedback(&mut self, rating: u8, comment: Option<String>) -> Result<(), DomainError> {
        if self.status != ComplaintStatus::Resolved {
            return Err(DomainError::InvalidState(
                "Feedback hanya dapat diberikan untuk keluhan yang sudah diselesaikan".to_string(),
            ));
        }
        if self.feedback.is_some() {
            return Err(DomainError::InvalidState(
                "Feedback sudah pernah diberikan".to_string(),
            ));
        }
        self.feedback = Some(Feedback {
            rating,
            comment: clean_text(comment),
            submitted_at: Utc::now(),
        });
        self.touch();
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    pub property_id: Uuid,
    pub unit_id: Uuid,

    /// Staff may file on behalf of a resident; ignored for residents
    pub resident: Option<Uuid>,

    #[validate(length(min = 5, max = 200, message = "Judul harus 5-200 karakter"))]
    pub title: String,

    #[validate(length(min = 10, max = 2000, message = "Deskripsi harus 10-2000 karakter"))]
    pub description: String,

    pub category: ComplaintCategory,

    #[serde(default)]
    pub priority: Priority,
}

impl RequestSchema for CreateComplaintRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ComplaintStatusRequest {
    pub status: ComplaintStatus,

    #[validate(length(max = 1000, message = "Catatan maksimal 1000 karakter"))]
    pub notes: Option<String>,
}

impl RequestSchema for ComplaintStatusRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Komentar harus 1-1000 karakter"))]
    pub text: String,
}

impl RequestSchema for CommentRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(range(min = 1, max = 5, message = "Rating harus antara 1 dan 5"))]
    pub rating: u8,

    #[validate(length(max = 500, message = "Komentar maksimal 500 karakter"))]
    pub comment: Option<String>,
}

impl RequestSchema for FeedbackRequest {}
