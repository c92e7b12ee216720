//! Per-entity descriptors.
//!
//! Every resource is described once by a static [`EntityDescriptor`]; the
//! query engine, repository, cache keys, stats aggregation and access checks
//! are all written generically against it.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::domain::Role;

/// How a raw query-string value is coerced before it becomes an equality constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Bool,
    Number,
    Uuid,
    /// Membership in an array field
    Tag,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub param: &'static str,
    pub path: &'static str,
    pub kind: FieldKind,
}

impl FilterField {
    pub const fn new(param: &'static str, path: &'static str, kind: FieldKind) -> Self {
        Self { param, path, kind }
    }
}

/// Summary of a referenced document joined into full-shape reads
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub path: &'static str,
    pub collection: &'static str,
    pub alias: &'static str,
    pub select: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct Distribution {
    pub key: &'static str,
    pub path: &'static str,
    pub values: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Sum,
    Avg,
}

#[derive(Debug, Clone, Copy)]
pub struct Metric {
    pub key: &'static str,
    pub path: &'static str,
    pub kind: MetricKind,
}

#[derive(Debug, Clone, Copy)]
pub struct StatsSpec {
    pub count_key: &'static str,
    pub distributions: &'static [Distribution],
    pub metrics: &'static [Metric],
}

#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    /// Listing
    pub read: &'static [Role],
    pub detail: &'static [Role],
    pub create: &'static [Role],
    pub update: &'static [Role],
    pub delete: &'static [Role],
    pub stats: &'static [Role],
    /// Residents only see documents whose value at this path is their own id
    pub resident_owner_path: Option<&'static str>,
}

#[derive(Debug)]
pub struct EntityDescriptor {
    pub collection: &'static str,
    pub label: &'static str,
    /// Path holding the owning tenant id
    pub owner_path: &'static str,
    pub search_fields: &'static [&'static str],
    pub filters: &'static [FilterField],
    pub relations: &'static [Relation],
    pub hidden_fields: &'static [&'static str],
    pub stats: StatsSpec,
    pub policy: AccessPolicy,
}

impl EntityDescriptor {
    pub fn filter_field(&self, param: &str) -> Option<&FilterField> {
        self.filters.iter().find(|f| f.param == param)
    }
}

pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const DESCRIPTOR: &'static EntityDescriptor;

    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
    fn touch(&mut self);

    fn deactivate(&mut self) {
        self.set_active(false);
        self.touch();
    }
}

/// Implements [`Entity`] for a struct with the standard bookkeeping fields
/// (`id`, `tenant_id`, `is_active`, `created_at`, `updated_at`).
#[macro_export]
macro_rules! tenant_scoped_entity {
    ($ty:ty, $descriptor:expr) => {
        impl $crate::entity::Entity for $ty {
            const DESCRIPTOR: &'static $crate::entity::EntityDescriptor = $descriptor;

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn tenant_id(&self) -> ::uuid::Uuid {
                self.tenant_id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn is_active(&self) -> bool {
                self.is_active
            }

            fn set_active(&mut self, active: bool) {
                self.is_active = active;
            }

            fn touch(&mut self) {
                self.updated_at = ::chrono::Utc::now();
            }
        }
    };
}
