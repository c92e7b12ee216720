//! Announcement domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::common::{Priority, Recurrence, ALL_ROLES, MANAGEMENT, PRIORITY_VALUES};
use crate::entity::{
    AccessPolicy, Distribution, Entity, EntityDescriptor, FieldKind, FilterField, Relation,
    StatsSpec,
};
use crate::tenant_scoped_entity;
use crate::validation::{rule_error, RequestSchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    All,
    Residents,
    Staff,
    Managers,
}

pub const AUDIENCE_VALUES: &[&str] = &["all", "residents", "staff", "managers"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementView {
    pub user: Uuid,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub author: Uuid,
    pub title: String,
    pub content: String,
    pub audience: Audience,
    pub priority: Priority,
    pub is_recurring: bool,
    pub recurrence: Option<Recurrence>,
    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub views: Vec<AnnouncementView>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const ANNOUNCEMENT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "announcements",
    label: "Pengumuman",
    owner_path: "tenantId",
    search_fields: &["title", "content"],
    filters: &[
        FilterField::new("propertyId", "propertyId", FieldKind::Uuid),
        FilterField::new("author", "author", FieldKind::Uuid),
        FilterField::new("audience", "audience", FieldKind::Text),
        FilterField::new("priority", "priority", FieldKind::Text),
        FilterField::new("isRecurring", "isRecurring", FieldKind::Bool),
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
            path: "author",
            collection: "users",
            alias: "authorInfo",
            select: &["name", "email"],
        },
    ],
    hidden_fields: &[],
    stats: StatsSpec {
        count_key: "totalAnnouncements",
        distributions: &[
            Distribution {
                key: "byAudience",
                path: "audience",
                values: AUDIENCE_VALUES,
            },
            Distribution {
                key: "byPriority",
                path: "priority",
                values: PRIORITY_VALUES,
            },
        ],
        metrics: &[],
    },
    policy: AccessPolicy {
        read: ALL_ROLES,
        detail: ALL_ROLES,
        create: MANAGEMENT,
        update: MANAGEMENT,
        delete: MANAGEMENT,
        stats: ALL_ROLES,
        resident_owner_path: None,
    },
};

tenant_scoped_entity!(Announcement, &ANNOUNCEMENT_DESCRIPTOR);

/// A recurrence only survives on recurring documents
fn effective_recurrence(is_recurring: bool, recurrence: Option<Recurrence>) -> Option<Recurrence> {
    if is_recurring {
        recurrence
    } else {
        None
    }
}

impl Announcement {
    pub fn new(
        tenant_id: Uuid,
        author: Uuid,
        req: CreateAnnouncementRequest,
        attachments: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            property_id: req.property_id,
            author,
            title: req.title.trim().to_string(),
            content: req.content,
            audience: req.audience,
            priority: req.priority,
            is_recurring: req.is_recurring,
            recurrence: effective_recurrence(req.is_recurring, req.recurrence),
            publish_date: req.publish_date,
            expiry_date: req.expiry_date,
            attachments,
            views: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, req: UpdateAnnouncementRequest, new_attachments: Vec<String>) {
        if let Some(title) = req.title {
            self.title = title.trim().to_string();
        }
        if let Some(content) = req.content {
            self.content = content;
        }
        if let Some(audience) = req.audience {
            self.audience = audience;
        }
        if let Some(priority) = req.priority {
            self.priority = priority;
        }
        if let Some(is_recurring) = req.is_recurring {
            self.is_recurring = is_recurring;
        }
        if req.recurrence.is_some() {
            self.recurrence = req.recurrence;
        }
        self.recurrence = effective_recurrence(self.is_recurring, self.recurrence.take());
        if req.publish_date.is_some() {
            self.publish_date = req.publish_date;
        }
        if req.expiry_date.is_some() {
            self.expiry_date = req.expiry_date;
        }
        self.attachments.extend(new_attachments);
        self.touch();
    }

    /// Returns `false` when the user had already viewed the announcement
    pub fn record_view(&mut self, user: Uuid) -> bool {
        if self.views.iter().any(|v| v.user == user) {
            return false;
        }
        self.views.push(AnnouncementView {
            user,
            viewed_at: Utc::now(),
        });
        true
    }
}

fn check_dates(
    publish: Option<DateTime<Utc>>,
    expiry: Option<DateTime<Utc>>,
    errors: &mut ValidationErrors,
) {
    if let (Some(publish), Some(expiry)) = (publish, expiry) {
        if expiry <= publish {
            errors.add(
                "expiryDate",
                rule_error("date_order", "Tanggal kedaluwarsa harus setelah tanggal terbit"),
            );
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    pub property_id: Uuid,

    #[validate(length(min = 3, max = 200, message = "Judul harus 3-200 karakter"))]
    pub title: String,

    #[validate(length(min = 10, max = 10000, message = "Isi pengumuman minimal 10 karakter"))]
    pub content: String,

    #[serde(default)]
    pub audience: Audience,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub is_recurring: bool,

    #[validate(nested)]
    pub recurrence: Option<Recurrence>,

    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl RequestSchema for CreateAnnouncementRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        if self.is_recurring && self.recurrence.is_none() {
            errors.add(
                "recurrence",
                rule_error("required", "Pola pengulangan wajib diisi untuk pengumuman berulang"),
            );
        }
        check_dates(self.publish_date, self.expiry_date, errors);
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    #[validate(length(min = 3, max = 200, message = "Judul harus 3-200 karakter"))]
    pub title: Option<String>,

    #[validate(length(min = 10, max = 10000, message = "Isi pengumuman minimal 10 karakter"))]
    pub content: Option<String>,

    pub audience: Option<Audience>,
    pub priority: Option<Priority>,
    pub is_recurring: Option<bool>,

    #[validate(nested)]
    pub recurrence: Option<Recurrence>,

    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl RequestSchema for UpdateAnnouncementRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        if self.is_recurring == Some(true) && self.recurrence.is_none() {
            errors.add(
                "recurrence",
                rule_error("required", "Pola pengulangan wajib diisi untuk pengumuman berulang"),
            );
        }
        check_dates(self.publish_date, self.expiry_date, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> CreateAnnouncementRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_recurring_requires_recurrence() {
        let req = request(json!({
            "propertyId": Uuid::new_v4(),
            "title": "Pemadaman air",
            "content": "Air akan dimatikan sementara.",
            "isRecurring": true
        }));
        let err = req.check().unwrap_err();
        assert!(matches!(err, crate::DomainError::Validation(ref e) if e[0].field == "recurrence"));
    }

    #[test]
    fn test_recurrence_discarded_when_not_recurring() {
        let req = request(json!({
            "propertyId": Uuid::new_v4(),
            "title": "Pemadaman air",
            "content": "Air akan dimatikan sementara.",
            "recurrence": { "frequency": "weekly", "interval": 2 }
        }));
        assert!(req.check().is_ok());
        let a = Announcement::new(Uuid::new_v4(), Uuid::new_v4(), req, vec![]);
        assert!(a.recurrence.is_none());
    }

    #[test]
    fn test_record_view_once_per_user() {
        let req = request(json!({
            "propertyId": Uuid::new_v4(),
            "title": "Rapat warga",
            "content": "Rapat warga hari Minggu."
        }));
        let mut a = Announcement::new(Uuid::new_v4(), Uuid::new_v4(), req, vec![]);
        let user = Uuid::new_v4();
        assert!(a.record_view(user));
        assert!(!a.record_view(user));
        assert_eq!(a.views.len(), 1);
    }

    #[test]
    fn test_expiry_before_publish_rejected() {
        let req = request(json!({
            "propertyId": Uuid::new_v4(),
            "title": "Rapat warga",
            "content": "Rapat warga hari Minggu.",
            "publishDate": "2024-05-02T00:00:00Z",
            "expiryDate": "2024-05-01T00:00:00Z"
        }));
        assert!(req.check().is_err());
    }

    #[test]
    fn test_turning_off_recurring_drops_recurrence() {
        let req = request(json!({
            "propertyId": Uuid::new_v4(),
            "title": "Kerja bakti",
            "content": "Kerja bakti setiap bulan.",
            "isRecurring": true,
            "recurrence": { "frequency": "monthly" }
        }));
        let mut a = Announcement::new(Uuid::new_v4(), Uuid::new_v4(), req, vec![]);
        assert!(a.recurrence.is_some());
        a.apply(
            UpdateAnnouncementRequest {
                is_recurring: Some(false),
                ..Default::default()
            },
            vec![],
        );
        assert!(a.recurrence.is_none());
    }
}
