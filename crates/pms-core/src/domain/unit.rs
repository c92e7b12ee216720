//! Unit domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::common::{clean_text, ADMIN_ONLY, ALL_ROLES, MANAGEMENT};
use crate::entity::{
    AccessPolicy, Distribution, Entity, EntityDescriptor, FieldKind, FilterField, Metric,
    MetricKind, Relation, StatsSpec,
};
use crate::error::DomainError;
use crate::tenant_scoped_entity;
use crate::validation::{rule_error, RequestSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Studio,
    OneBedroom,
    TwoBedroom,
    ThreeBedroom,
    Penthouse,
    Commercial,
}

pub const UNIT_TYPE_VALUES: &[&str] = &[
    "studio",
    "one_bedroom",
    "two_bedroom",
    "three_bedroom",
    "penthouse",
    "commercial",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Available,
    Occupied,
    Maintenance,
    Reserved,
}

pub const UNIT_STATUS_VALUES: &[&str] = &["available", "occupied", "maintenance", "reserved"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub unit_number: String,
    pub floor: Option<i32>,
    #[serde(rename = "type")]
    pub kind: UnitType,
    pub status: UnitStatus,
    pub size: Option<f64>,
    pub rent: f64,
    pub current_occupant: Option<Uuid>,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const UNIT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "units",
    label: "Unit",
    owner_path: "tenantId",
    search_fields: &["unitNumber", "description"],
    filters: &[
        FilterField::new("propertyId", "propertyId", FieldKind::Uuid),
        FilterField::new("status", "status", FieldKind::Text),
        FilterField::new("type", "type", FieldKind::Text),
        FilterField::new("floor", "floor", FieldKind::Number),
        FilterField::new("currentOccupant", "currentOccupant", FieldKind::Uuid),
        FilterField::new("isActive", "isActive", FieldKind::Bool),
    ],
    relations: &[
        Relation {
            path: "propertyId",
            collection: "properties",
            alias: "property",
            select: &["name", "address"],
        },
        Relation {
            path: "currentOccupant",
            collection: "users",
            alias: "occupant",
            select: &["name", "email", "phone"],
        },
    ],
    hidden_fields: &[],
    stats: StatsSpec {
        count_key: "totalUnits",
        distributions: &[
            Distribution {
                key: "byStatus",
                path: "status",
                values: UNIT_STATUS_VALUES,
            },
            Distribution {
                key: "byType",
                path: "type",
                values: UNIT_TYPE_VALUES,
            },
        ],
        metrics: &[Metric {
            key: "averageRent",
            path: "rent",
            kind: MetricKind::Avg,
        }],
    },
    policy: AccessPolicy {
        read: ALL_ROLES,
        detail: ALL_ROLES,
        create: MANAGEMENT,
        update: MANAGEMENT,
        delete: ADMIN_ONLY,
        stats: ALL_ROLES,
        resident_owner_path: None,
    },
};

tenant_scoped_entity!(Unit, &UNIT_DESCRIPTOR);

impl Unit {
    pub fn new(tenant_id: Uuid, req: CreateUnitRequest, images: Vec<String>) -> Self {
        let now = Utc::now();
        let current_occupant = match req.status {
            UnitStatus::Available => None,
            _ => req.current_occupant,
        };
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            property_id: req.property_id,
            unit_number: req.unit_number.trim().to_string(),
            floor: req.floor,
            kind: req.kind,
            status: req.status,
            size: req.size,
            rent: req.rent,
            current_occupant,
            description: clean_text(req.description),
            images,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// `occupied` needs an occupant (given or already recorded); `available` clears it.
    pub fn set_status(
        &mut self,
        status: UnitStatus,
        occupant: Option<Uuid>,
    ) -> Result<(), DomainError> {
        match status {
            UnitStatus::Occupied => {
                let occupant = occupant.or(self.current_occupant).ok_or_else(|| {
                    DomainError::field("currentOccupant", "Penghuni wajib diisi untuk unit terisi")
                })?;
                self.current_occupant = Some(occupant);
            }
            UnitStatus::Available => self.current_occupant = None,
            UnitStatus::Maintenance | UnitStatus::Reserved => {
                if occupant.is_some() {
                    self.current_occupant = occupant;
                }
            }
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    pub fn apply(
        &mut self,
        req: UpdateUnitRequest,
        new_images: Vec<String>,
    ) -> Result<(), DomainError> {
        if let Some(unit_number) = req.unit_number {
            self.unit_number = unit_number.trim().to_string();
        }
        if req.floor.is_some() {
            self.floor = req.floor;
        }
        if let Some(kind) = req.kind {
            self.kind = kind;
        }
        if req.size.is_some() {
            self.size = req.size;
        }
        if let Some(rent) = req.rent {
            self.rent = rent;
        }
        if req.description.is_some() {
            self.description = clean_text(req.description);
        }
        self.images.extend(new_images);
        match req.status {
            Some(status) => self.set_status(status, req.current_occupant)?,
            None => {
                if req.current_occupant.is_some() {
                    self.current_occupant = req.current_occupant;
                }
                self.touch();
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnitRequest {
    pub property_id: Uuid,

    #[validate(length(min = 1, max = 20, message = "Nomor unit harus 1-20 karakter"))]
    pub unit_number: String,

    #[validate(range(min = -10, max = 300, message = "Lantai tidak valid"))]
    pub floor: Option<i32>,

    #[serde(rename = "type")]
    pub kind: UnitType,

    #[serde(default)]
    pub status: UnitStatus,

    #[validate(range(min = 0.0, message = "Luas tidak boleh negatif"))]
    pub size: Option<f64>,

    #[validate(range(min = 0.0, message = "Harga sewa tidak boleh negatif"))]
    pub rent: f64,

    pub current_occupant: Option<Uuid>,

    #[validate(length(max = 500, message = "Deskripsi maksimal 500 karakter"))]
    pub description: Option<String>,
}

impl RequestSchema for CreateUnitRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        if self.status == UnitStatus::Occupied && self.current_occupant.is_none() {
            errors.add(
                "currentOccupant",
                rule_error("required", "Penghuni wajib diisi untuk unit terisi"),
            );
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUnitRequest {
    #[validate(length(min = 1, max = 20, message = "Nomor unit harus 1-20 karakter"))]
    pub unit_number: Option<String>,

    #[validate(range(min = -10, max = 300, message = "Lantai tidak valid"))]
    pub floor: Option<i32>,

    #[serde(rename = "type")]
    pub kind: Option<UnitType>,

    pub status: Option<UnitStatus>,

    #[validate(range(min = 0.0, message = "Luas tidak boleh negatif"))]
    pub size: Option<f64>,

    #[validate(range(min = 0.0, message = "Harga sewa tidak boleh negatif"))]
    pub rent: Option<f64>,

    pub current_occupant: Option<Uuid>,

    #[validate(length(max = 500, message = "Deskripsi maksimal 500 karakter"))]
    pub description: Option<String>,
}

impl RequestSchema for UpdateUnitRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UnitStatusRequest {
    pub status: UnitStatus,
    pub current_occupant: Option<Uuid>,
}

impl RequestSchema for UnitStatusRequest {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit() -> Unit {
        let req: CreateUnitRequest = serde_json::from_value(json!({
            "propertyId": Uuid::new_v4(),
            "unitNumber": " A-101 ",
            "type": "studio",
            "rent": 2500000
        }))
        .unwrap();
        Unit::new(Uuid::new_v4(), req, vec![])
    }

    #[test]
    fn test_new_unit_defaults_available() {
        let u = unit();
        assert_eq!(u.status, UnitStatus::Available);
        assert_eq!(u.unit_number, "A-101");
    }

    #[test]
    fn test_occupied_requires_occupant() {
        let mut u = unit();
        assert!(u.set_status(UnitStatus::Occupied, None).is_err());
        assert_eq!(u.status, UnitStatus::Available);

        let resident = Uuid::new_v4();
        u.set_status(UnitStatus::Occupied, Some(resident)).unwrap();
        assert_eq!(u.current_occupant, Some(resident));

        // occupant is kept when re-marking occupied
        u.set_status(UnitStatus::Occupied, None).unwrap();
        assert_eq!(u.current_occupant, Some(resident));
    }

    #[test]
    fn test_available_clears_occupant() {
        let mut u = unit();
        u.set_status(UnitStatus::Occupied, Some(Uuid::new_v4())).unwrap();
        u.set_status(UnitStatus::Available, None).unwrap();
        assert!(u.current_occupant.is_none());
    }

    #[test]
    fn test_create_occupied_without_occupant_fails() {
        let req: CreateUnitRequest = serde_json::from_value(json!({
            "propertyId": Uuid::new_v4(),
            "unitNumber": "B-2",
            "type": "penthouse",
            "status": "occupied",
            "rent": 1
        }))
        .unwrap();
        assert!(req.check().is_err());
    }
}
