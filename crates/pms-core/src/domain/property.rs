//! Property domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{clean_text, Address, ADMIN_ONLY, ALL_ROLES, MANAGEMENT};
use crate::entity::{
    AccessPolicy, Distribution, Entity, EntityDescriptor, FieldKind, FilterField, Metric,
    MetricKind, Relation, StatsSpec,
};
use crate::tenant_scoped_entity;
use crate::validation::RequestSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    House,
    Villa,
    BoardingHouse,
    Commercial,
    Office,
}

pub const PROPERTY_TYPE_VALUES: &[&str] = &[
    "apartment",
    "house",
    "villa",
    "boarding_house",
    "commercial",
    "office",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Address,
    pub total_units: u32,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PROPERTY_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "properties",
    label: "Properti",
    owner_path: "tenantId",
    search_fields: &["name", "description", "address.street", "address.city"],
    filters: &[
        FilterField::new("type", "type", FieldKind::Text),
        FilterField::new("city", "address.city", FieldKind::Text),
        FilterField::new("amenity", "amenities", FieldKind::Tag),
        FilterField::new("totalUnits", "totalUnits", FieldKind::Number),
        FilterField::new("isActive", "isActive", FieldKind::Bool),
    ],
    relations: &[Relation {
        path: "tenantId",
        collection: "tenants",
        alias: "tenant",
        select: &["name", "code"],
    }],
    hidden_fields: &[],
    stats: StatsSpec {
        count_key: "totalProperties",
        distributions: &[Distribution {
            key: "byType",
            path: "type",
            values: PROPERTY_TYPE_VALUES,
        }],
        metrics: &[
            Metric {
                key: "totalUnits",
                path: "totalUnits",
                kind: MetricKind::Sum,
            },
            Metric {
                key: "averagePrice",
                path: "price",
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
        stats: ALL_ROLES,
        resident_owner_path: None,
    },
};

tenant_scoped_entity!(Property, &PROPERTY_DESCRIPTOR);

/// Trim and collapse duplicate amenities, keeping first occurrence order
pub fn dedupe_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(amenities.len());
    for amenity in amenities {
        let amenity = amenity.trim().to_string();
        if !amenity.is_empty() && !out.contains(&amenity) {
            out.push(amenity);
        }
    }
    out
}

impl Property {
    pub fn new(tenant_id: Uuid, req: CreatePropertyRequest, images: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: req.name.trim().to_string(),
            description: clean_text(req.description),
            address: req.address,
            total_units: req.total_units,
            price: req.price,
            kind: req.kind,
            amenities: dedupe_amenities(req.amenities),
            images,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, req: UpdatePropertyRequest, new_images: Vec<String>) {
        if let Some(name) = req.name {
            self.name = name.trim().to_string();
        }
        if req.description.is_some() {
            self.description = clean_text(req.description);
        }
        if let Some(address) = req.address {
            self.address = address;
        }
        if let Some(total_units) = req.total_units {
            self.total_units = total_units;
        }
        if let Some(price) = req.price {
            self.price = price;
        }
        if let Some(kind) = req.kind {
            self.kind = kind;
        }
        if let Some(amenities) = req.amenities {
            self.amenities = dedupe_amenities(amenities);
        }
        self.images.extend(new_images);
        self.touch();
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
    #[validate(length(min = 3, max = 100, message = "Nama properti harus 3-100 karakter"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Deskripsi maksimal 1000 karakter"))]
    pub description: Option<String>,

    #[validate(nested)]
    pub address: Address,

    #[validate(range(min = 1, message = "Jumlah unit minimal 1"))]
    pub total_units: u32,

    #[validate(range(min = 0.0, message = "Harga tidak boleh negatif"))]
    pub price: f64,

    #[serde(rename = "type")]
    pub kind: PropertyType,

    #[serde(default)]
    pub amenities: Vec<String>,
}

impl RequestSchema for CreatePropertyRequest {}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyRequest {
    #[validate(length(min = 3, max = 100, message = "Nama properti harus 3-100 karakter"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Deskripsi maksimal 1000 karakter"))]
    pub description: Option<String>,

    #[validate(nested)]
    pub address: Option<Address>,

    #[validate(range(min = 1, message = "Jumlah unit minimal 1"))]
    pub total_units: Option<u32>,

    #[validate(range(min = 0.0, message = "Harga tidak boleh negatif"))]
    pub price: Option<f64>,

    #[serde(rename = "type")]
    pub kind: Option<PropertyType>,

    pub amenities: Option<Vec<String>>,
}

impl RequestSchema for UpdatePropertyRequest {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CreatePropertyRequest {
        serde_json::from_value(json!({
            "name": "Griya Asri",
            "address": { "street": "Jl. Melati 1", "city": "Bandung" },
            "totalUnits": 10,
            "price": 1500000,
            "type": "apartment",
            "amenities": ["pool", " gym", "pool"]
        }))
        .unwrap()
    }

    #[test]
    fn test_create_collapses_duplicate_amenities() {
        let req = request();
        assert!(req.check().is_ok());
        let property = Property::new(Uuid::new_v4(), req, vec![]);
        assert_eq!(property.amenities, vec!["pool", "gym"]);
        assert_eq!(property.address.country, "Indonesia");
    }

    #[test]
    fn test_zero_units_rejected() {
        let mut req = request();
        req.total_units = 0;
        let err = req.check().unwrap_err();
        assert!(matches!(err, crate::DomainError::Validation(ref e) if e[0].field == "totalUnits"));
    }

    #[test]
    fn test_serializes_type_key() {
        let property = Property::new(Uuid::new_v4(), request(), vec![]);
        let value = serde_json::to_value(&property).unwrap();
        assert_eq!(value["type"], "apartment");
        assert_eq!(value["totalUnits"], 10);
    }

    #[test]
    fn test_apply_appends_images() {
        let mut property = Property::new(Uuid::new_v4(), request(), vec!["/uploads/a.jpg".into()]);
        property.apply(
            UpdatePropertyRequest {
                price: Some(2_000_000.0),
                ..Default::default()
            },
            vec!["/uploads/b.jpg".into()],
        );
        assert_eq!(property.images.len(), 2);
        assert_eq!(property.price, 2_000_000.0);
    }
}
