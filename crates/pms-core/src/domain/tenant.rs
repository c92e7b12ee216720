//! Tenant domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::common::{clean_text, Address, ADMIN_ONLY, MANAGEMENT};
use crate::entity::{
    AccessPolicy, Distribution, Entity, EntityDescriptor, FieldKind, FilterField, StatsSpec,
};
use crate::validation::{rule_error, RequestSchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Basic,
    Premium,
    Enterprise,
}

pub const SUBSCRIPTION_PLAN_VALUES: &[&str] = &["free", "basic", "premium", "enterprise"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Trial,
    Active,
    Suspended,
    Expired,
    Cancelled,
}

pub const SUBSCRIPTION_STATUS_VALUES: &[&str] =
    &["trial", "active", "suspended", "expired", "cancelled"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TenantContact {
    #[validate(email(message = "Email kontak tidak valid"))]
    pub email: String,

    #[validate(length(min = 6, max = 20, message = "Nomor telepon harus 6-20 karakter"))]
    pub phone: Option<String>,

    #[validate(nested)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub contact: TenantContact,
    pub subscription: Subscription,
    pub logo: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TENANT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "tenants",
    label: "Tenant",
    owner_path: "id",
    search_fields: &["name", "code", "contact.email"],
    filters: &[
        FilterField::new("code", "code", FieldKind::Text),
        FilterField::new("plan", "subscription.plan", FieldKind::Text),
        FilterField::new("status", "subscription.status", FieldKind::Text),
        FilterField::new("isActive", "isActive", FieldKind::Bool),
    ],
    relations: &[],
    hidden_fields: &[],
    stats: StatsSpec {
        count_key: "totalTenants",
        distributions: &[
            Distribution {
                key: "byPlan",
                path: "subscription.plan",
                values: SUBSCRIPTION_PLAN_VALUES,
            },
            Distribution {
                key: "bySubscriptionStatus",
                path: "subscription.status",
                values: SUBSCRIPTION_STATUS_VALUES,
            },
        ],
        metrics: &[],
    },
    policy: AccessPolicy {
        read: ADMIN_ONLY,
        detail: MANAGEMENT,
        create: ADMIN_ONLY,
        update: ADMIN_ONLY,
        delete: ADMIN_ONLY,
        stats: ADMIN_ONLY,
        resident_owner_path: None,
    },
};

impl Entity for Tenant {
    const DESCRIPTOR: &'static EntityDescriptor = &TENANT_DESCRIPTOR;

    fn id(&self) -> Uuid {
        self.id
    }

    /// A tenant owns itself
    fn tenant_id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Tenant {
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn new(
        name: String,
        code: &str,
        description: Option<String>,
        contact: TenantContact,
        plan: SubscriptionPlan,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            code: Self::normalize_code(code),
            description: clean_text(description),
            contact: TenantContact {
                email: contact.email.trim().to_lowercase(),
                ..contact
            },
            subscription: Subscription {
                plan,
                status: SubscriptionStatus::Trial,
                start_date: now,
                end_date: None,
            },
            logo: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, req: UpdateTenantRequest) {
        if let Some(name) = req.name {
            self.name = name.trim().to_string();
        }
        if req.description.is_some() {
            self.description = clean_text(req.description);
        }
        if let Some(contact) = req.contact {
            self.contact = TenantContact {
                email: contact.email.trim().to_lowercase(),
                ..contact
            };
        }
        self.touch();
    }

    pub fn update_subscription(&mut self, req: UpdateSubscriptionRequest) {
        if let Some(plan) = req.plan {
            self.subscription.plan = plan;
        }
        if let Some(status) = req.status {
            self.subscription.status = status;
        }
        if req.end_date.is_some() {
            self.subscription.end_date = req.end_date;
        }
        self.touch();
    }
}

/// Admin account created together with a new tenant
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnboardAdmin {
    #[validate(length(min = 2, max = 100, message = "Nama harus 2-100 karakter"))]
    pub name: String,

    #[validate(email(message = "Format email tidak valid"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password minimal 6 karakter"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnboardTenantRequest {
    #[validate(length(min = 2, max = 100, message = "Nama tenant harus 2-100 karakter"))]
    pub name: String,

    #[validate(length(min = 2, max = 20, message = "Kode tenant harus 2-20 karakter"))]
    pub code: String,

    #[validate(length(max = 500, message = "Deskripsi maksimal 500 karakter"))]
    pub description: Option<String>,

    #[validate(nested)]
    pub contact: TenantContact,

    #[serde(default)]
    pub plan: SubscriptionPlan,

    #[validate(nested)]
    pub admin: OnboardAdmin,
}

impl RequestSchema for OnboardTenantRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        if !self
            .code
            .trim()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            errors.add(
                "code",
                rule_error("code_format", "Kode tenant hanya boleh huruf, angka, - dan _"),
            );
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantRequest {
    #[validate(length(min = 2, max = 100, message = "Nama tenant harus 2-100 karakter"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Deskripsi maksimal 500 karakter"))]
    pub description: Option<String>,

    #[validate(nested)]
    pub contact: Option<TenantContact>,
}

impl RequestSchema for UpdateTenantRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub plan: Option<SubscriptionPlan>,
    pub status: Option<SubscriptionStatus>,
    pub end_date: Option<DateTime<Utc>>,
}

impl RequestSchema for UpdateSubscriptionRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        if self.plan.is_none() && self.status.is_none() && self.end_date.is_none() {
            errors.add(
                "subscription",
                rule_error("empty", "Minimal satu field langganan harus diisi"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> TenantContact {
        TenantContact {
            email: " Admin@Example.COM ".into(),
            phone: None,
            address: None,
        }
    }

    #[test]
    fn test_new_tenant_normalizes_code_and_email() {
        let tenant = Tenant::new("Griya".into(), " gr-01 ", None, contact(), SubscriptionPlan::Basic);
        assert_eq!(tenant.code, "GR-01");
        assert_eq!(tenant.contact.email, "admin@example.com");
        assert_eq!(tenant.subscription.status, SubscriptionStatus::Trial);
        assert_eq!(tenant.tenant_id(), tenant.id);
    }

    #[test]
    fn test_update_subscription_requires_a_field() {
        let empty = UpdateSubscriptionRequest {
            plan: None,
            status: None,
            end_date: None,
        };
        assert!(empty.check().is_err());

        let mut tenant = Tenant::new("Griya".into(), "GR", None, contact(), SubscriptionPlan::Free);
        tenant.update_subscription(UpdateSubscriptionRequest {
            plan: Some(SubscriptionPlan::Premium),
            status: Some(SubscriptionStatus::Active),
            end_date: None,
        });
        assert_eq!(tenant.subscription.plan, SubscriptionPlan::Premium);
        assert_eq!(tenant.subscription.status, SubscriptionStatus::Active);
    }

    #[test]
    fn test_onboard_rejects_bad_code() {
        let req: OnboardTenantRequest = serde_json::from_value(serde_json::json!({
            "name": "Griya Asri",
            "code": "gr asri!",
            "contact": { "email": "a@x.com" },
            "admin": { "name": "Admin", "email": "admin@x.com", "password": "secret1" }
        }))
        .unwrap();
        let err = req.check().unwrap_err();
        assert!(matches!(err, crate::DomainError::Validation(ref e) if e[0].field == "code"));
    }

    #[test]
    fn test_enum_values_match_serde() {
        for (i, plan) in [
            SubscriptionPlan::Free,
            SubscriptionPlan::Basic,
            SubscriptionPlan::Premium,
            SubscriptionPlan::Enterprise,
        ]
        .iter()
        .enumerate()
        {
            assert_eq!(serde_json::to_value(plan).unwrap(), SUBSCRIPTION_PLAN_VALUES[i]);
        }
    }
}
