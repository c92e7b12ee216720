//! Maintenance task domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use pms_shared::constants::DEFAULT_CURRENCY;

use super::common::{
    clean_text, Priority, Recurrence, ADMIN_ONLY, ALL_ROLES, MANAGEMENT, OPERATIONS,
    PRIORITY_VALUES,
};
use crate::entity::{
    AccessPolicy, Distribution, Entity, EntityDescriptor, FieldKind, FilterField, Metric,
    MetricKind, Relation, StatsSpec,
};
use crate::error::DomainError;
use crate::tenant_scoped_entity;
use crate::validation::{rule_error, RequestSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    Preventive,
    Corrective,
    Emergency,
    Inspection,
}

pub const MAINTENANCE_TYPE_VALUES: &[&str] =
    &["preventive", "corrective", "emergency", "inspection"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

pub const MAINTENANCE_STATUS_VALUES: &[&str] =
    &["pending", "scheduled", "in_progress", "completed", "cancelled"];

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Pending => "pending",
            MaintenanceStatus::Scheduled => "scheduled",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Completed => "completed",
            MaintenanceStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceCategory {
    Plumbing,
    Electrical,
    Hvac,
    Structural,
    Appliance,
    Cleaning,
    Landscaping,
    Other,
}

pub const MAINTENANCE_CATEGORY_VALUES: &[&str] = &[
    "plumbing",
    "electrical",
    "hvac",
    "structural",
    "appliance",
    "cleaning",
    "landscaping",
    "other",
];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    #[validate(nested)]
    pub recurrence: Option<Recurrence>,
}

impl Schedule {
    /// Drops a recurrence supplied without the recurring flag
    fn normalized(mut self) -> Self {
        if !self.is_recurring {
            self.recurrence = None;
        }
        self
    }

    fn check(&self, errors: &mut ValidationErrors) {
        if self.end_date <= self.start_date {
            errors.add(
                "schedule.endDate",
                rule_error("date_order", "Tanggal selesai harus setelah tanggal mulai"),
            );
        }
        if self.is_recurring && self.recurrence.is_none() {
            errors.add(
                "schedule.recurrence",
                rule_error("required", "Pola pengulangan wajib diisi untuk jadwal berulang"),
            );
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    #[validate(range(min = 0.0, message = "Estimasi biaya tidak boleh negatif"))]
    pub estimated: f64,

    #[validate(range(min = 0.0, message = "Biaya aktual tidak boleh negatif"))]
    pub actual: Option<f64>,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Mata uang harus 3 huruf"))]
    pub currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: MaintenanceType,
    pub priority: Priority,
    pub status: MaintenanceStatus,
    pub category: MaintenanceCategory,
    pub schedule: Schedule,
    pub cost: Cost,
    pub assigned_to: Option<Uuid>,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const MAINTENANCE_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "maintenances",
    label: "Tugas pemeliharaan",
    owner_path: "tenantId",
    search_fields: &["title", "description", "notes"],
    filters: &[
        FilterField::new("status", "status", FieldKind::Text),
        FilterField::new("type", "type", FieldKind::Text),
        FilterField::new("priority", "priority", FieldKind::Text),
        FilterField::new("category", "category", FieldKind::Text),
        FilterField::new("propertyId", "propertyId", FieldKind::Uuid),
        FilterField::new("unitId", "unitId", FieldKind::Uuid),
        FilterField::new("assignedTo", "assignedTo", FieldKind::Uuid),
        FilterField::new("isRecurring", "schedule.isRecurring", FieldKind::Bool),
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
            path: "assignedTo",
            collection: "users",
            alias: "assignee",
            select: &["name", "email"],
        },
    ],
    hidden_fields: &[],
    stats: StatsSpec {
        count_key: "totalTasks",
        distributions: &[
            Distribution {
                key: "byStatus",
                path: "status",
                values: MAINTENANCE_STATUS_VALUES,
            },
            Distribution {
                key: "byType",
                path: "type",
                values: MAINTENANCE_TYPE_VALUES,
            },
            Distribution {
                key: "byPriority",
                path: "priority",
                values: PRIORITY_VALUES,
            },
            Distribution {
                key: "byCategory",
                path: "category",
                values: MAINTENANCE_CATEGORY_VALUES,
            },
        ],
        metrics: &[
            Metric {
                key: "totalEstimatedCost",
                path: "cost.estimated",
                kind: MetricKind::Sum,
            },
            Metric {
                key: "totalActualCost",
                path: "cost.actual",
                kind: MetricKind::Sum,
            },
            Metric {
                key: "averageActualCost",
                path: "cost.actual",
                kind: MetricKind::Avg,
            },
        ],
    },
    policy: AccessPolicy {
        read: ALL_ROLES,
        detail: ALL_ROLES,
        create: MANAGEMENT,
        update: MANAGEMENT,
        delete: ADMIN_ONLY,
        stats: OPERATIONS,
        resident_owner_path: None,
    },
};

tenant_scoped_entity!(Maintenance, &MAINTENANCE_DESCRIPTOR);

impl Maintenance {
    pub fn new(tenant_id: Uuid, req: CreateMaintenanceRequest, images: Vec<String>) -> Self {
        let now = Utc::now();
        let status = if req.assigned_to.is_some() {
            MaintenanceStatus::Scheduled
        } else {
            MaintenanceStatus::Pending
        };
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            property_id: req.property_id,
            unit_id: req.unit_id,
            title: req.title.trim().to_string(),
            description: req.description,
            kind: req.kind,
            priority: req.priority,
            status,
            category: req.category,
            schedule: req.schedule.normalized(),
            cost: req.cost,
            assigned_to: req.assigned_to,
            completed_by: None,
            completed_at: None,
            notes: clean_text(req.notes),
            images,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, req: UpdateMaintenanceRequest, new_images: Vec<String>) {
        if let Some(schedule) = req.schedule {
            self.schedule = schedule.normalized();
        }
        if let Some(title) = req.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = req.description {
            self.description = description;
        }
        if let Some(kind) = req.kind {
            self.kind = kind;
        }
        if let Some(priority) = req.priority {
            self.priority = priority;
        }
        if let Some(category) = req.category {
            self.category = category;
        }
        if let Some(cost) = req.cost {
            self.cost = cost;
        }
        if req.notes.is_some() {
            self.notes = clean_text(req.notes);
        }
        self.images.extend(new_images);
        self.touch();
    }

    /// Completing stamps `completedAt`/`completedBy`
    pub fn change_status(
        &mut self,
        status: MaintenanceStatus,
        by: Uuid,
        req: &MaintenanceStatusRequest,
    ) -> Result<(), DomainError> {
        if self.status == MaintenanceStatus::Completed && status != MaintenanceStatus::Completed {
            return Err(DomainError::InvalidState(
                "Tugas yang sudah selesai tidak dapat diubah statusnya".to_string(),
            ));
        }
        if status == MaintenanceStatus::Completed {
            self.completed_at = Some(Utc::now());
            self.completed_by = Some(by);
        }
        if let Some(actual) = req.actual_cost {
            self.cost.actual = Some(actual);
        }
        if req.notes.is_some() {
            self.notes = clean_text(req.notes.clone());
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    /// Assigning a pending task schedules it
    pub fn assign(&mut self, user: Uuid) {
        self.assigned_to = Some(user);
        if self.status == MaintenanceStatus::Pending {
            self.status = MaintenanceStatus::Scheduled;
        }
        self.touch();
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceRequest {
    pub property_id: Uuid,
    pub unit_id: Uuid,

    #[validate(length(min = 3, max = 200, message = "Judul harus 3-200 karakter"))]
    pub title: String,

    #[validate(length(min = 10, max = 2000, message = "Deskripsi harus 10-2000 karakter"))]
    pub description: String,

    #[serde(rename = "type")]
    pub kind: MaintenanceType,

    #[serde(default)]
    pub priority: Priority,

    pub category: MaintenanceCategory,

    #[validate(nested)]
    pub schedule: Schedule,

    #[validate(nested)]
    pub cost: Cost,

    pub assigned_to: Option<Uuid>,

    #[validate(length(max = 1000, message = "Catatan maksimal 1000 karakter"))]
    pub notes: Option<String>,
}

impl RequestSchema for CreateMaintenanceRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        self.schedule.check(errors);
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaintenanceRequest {
    #[validate(length(min = 3, max = 200, message = "Judul harus 3-200 karakter"))]
    pub title: Option<String>,

    #[validate(length(min = 10, max = 2000, message = "Deskripsi harus 10-2000 karakter"))]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<MaintenanceType>,

    pub priority: Option<Priority>,
    pub category: Option<MaintenanceCategory>,

    #[validate(nested)]
    pub schedule: Option<Schedule>,

    #[validate(nested)]
    pub cost: Option<Cost>,

    #[validate(length(max = 1000, message = "Catatan maksimal 1000 karakter"))]
    pub notes: Option<String>,
}

impl RequestSchema for UpdateMaintenanceRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        if let Some(schedule) = &self.schedule {
            schedule.check(errors);
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStatusRequest {
    pub status: MaintenanceStatus,

    #[validate(range(min = 0.0, message = "Biaya aktual tidak boleh negatif"))]
    pub actual_cost: Option<f64>,

    #[validate(length(max = 1000, message = "Catatan maksimal 1000 karakter"))]
    pub notes: Option<String>,
}

impl RequestSchema for MaintenanceStatusRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignMaintenanceRequest {
    pub assigned_to: Uuid,
}

impl RequestSchema for AssignMaintenanceRequest {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(start: &str, end: &str) -> serde_json::Value {
        json!({
            "propertyId": Uuid::new_v4(),
            "unitId": Uuid::new_v4(),
            "title": "Servis AC",
            "description": "Servis rutin AC seluruh unit.",
            "type": "preventive",
            "category": "hvac",
            "schedule": { "startDate": start, "endDate": end },
            "cost": { "estimated": 500000 }
        })
    }

    #[test]
    fn test_end_before_start_rejected_on_schedule_end_date() {
        let req: CreateMaintenanceRequest =
            serde_json::from_value(body("2024-06-02T00:00:00Z", "2024-06-02T00:00:00Z")).unwrap();
        let err = req.check().unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "schedule.endDate");
    }

    #[test]
    fn test_valid_task_starts_pending() {
        let req: CreateMaintenanceRequest =
            serde_json::from_value(body("2024-06-01T00:00:00Z", "2024-06-02T00:00:00Z")).unwrap();
        assert!(req.check().is_ok());
        let task = Maintenance::new(Uuid::new_v4(), req, vec![]);
        assert_eq!(task.status, MaintenanceStatus::Pending);
        assert_eq!(task.cost.currency, "IDR");
    }

    #[test]
    fn test_assign_schedules_pending_task() {
        let req: CreateMaintenanceRequest =
            serde_json::from_value(body("2024-06-01T00:00:00Z", "2024-06-02T00:00:00Z")).unwrap();
        let mut task = Maintenance::new(Uuid::new_v4(), req, vec![]);
        let staff = Uuid::new_v4();
        task.assign(staff);
        assert_eq!(task.assigned_to, Some(staff));
        assert_eq!(task.status, MaintenanceStatus::Scheduled);
    }

    #[test]
    fn test_completion_stamps_completed_fields() {
        let req: CreateMaintenanceRequest =
            serde_json::from_value(body("2024-06-01T00:00:00Z", "2024-06-02T00:00:00Z")).unwrap();
        let mut task = Maintenance::new(Uuid::new_v4(), req, vec![]);
        let staff = Uuid::new_v4();
        let status_req = MaintenanceStatusRequest {
            status: MaintenanceStatus::Completed,
            actual_cost: Some(450000.0),
            notes: None,
        };
        task.change_status(MaintenanceStatus::Completed, staff, &status_req).unwrap();
        assert_eq!(task.completed_by, Some(staff));
        assert!(task.completed_at.is_some());
        assert_eq!(task.cost.actual, Some(450000.0));
    }

    #[test]
    fn test_recurring_schedule_requires_recurrence() {
        let mut value = body("2024-06-01T00:00:00Z", "2024-06-02T00:00:00Z");
        value["schedule"]["isRecurring"] = json!(true);
        let req: CreateMaintenanceRequest = serde_json::from_value(value).unwrap();
        assert!(req.check().is_err());
    }
}
