//! User domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::common::{clean_text, Role, ADMIN_ONLY, MANAGEMENT};
use crate::entity::{
    AccessPolicy, Distribution, Entity, EntityDescriptor, FieldKind, FilterField, StatsSpec,
};
use crate::tenant_scoped_entity;
use crate::validation::{rule_error, RequestSchema};

pub const ROLE_VALUES: &[&str] = &["admin", "manager", "staff", "resident"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub unit_id: Option<Uuid>,
    pub is_email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_token_expires: Option<DateTime<Utc>>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
    #[serde(default = "empty_object")]
    pub preferences: Value,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

pub const USER_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "users",
    label: "User",
    owner_path: "tenantId",
    search_fields: &["name", "email", "phone"],
    filters: &[
        FilterField::new("role", "role", FieldKind::Text),
        FilterField::new("unitId", "unitId", FieldKind::Uuid),
        FilterField::new("isEmailVerified", "isEmailVerified", FieldKind::Bool),
        FilterField::new("isActive", "isActive", FieldKind::Bool),
    ],
    relations: &[],
    hidden_fields: &[
        "passwordHash",
        "verificationToken",
        "verificationTokenExpires",
        "resetPasswordToken",
        "resetPasswordExpires",
    ],
    stats: StatsSpec {
        count_key: "totalUsers",
        distributions: &[Distribution {
            key: "byRole",
            path: "role",
            values: ROLE_VALUES,
        }],
        metrics: &[],
    },
    policy: AccessPolicy {
        read: MANAGEMENT,
        detail: MANAGEMENT,
        create: ADMIN_ONLY,
        update: ADMIN_ONLY,
        delete: ADMIN_ONLY,
        stats: MANAGEMENT,
        resident_owner_path: None,
    },
};

tenant_scoped_entity!(User, &USER_DESCRIPTOR);

impl User {
    pub fn new(tenant_id: Uuid, name: String, email: &str, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.trim().to_string(),
            email: pms_shared::utils::normalize_email(email),
            password_hash,
            role,
            phone: None,
            avatar: None,
            unit_id: None,
            is_email_verified: false,
            verification_token: None,
            verification_token_expires: None,
            reset_password_token: None,
            reset_password_expires: None,
            preferences: empty_object(),
            last_login: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Display name derived from the email local part
    pub fn default_name(email: &str) -> String {
        email.split('@').next().unwrap_or(email).to_string()
    }

    pub fn record_login(&mut self) {
        self.last_login = Some(Utc::now());
        self.touch();
    }

    pub fn set_verification_token(&mut self, digest: String, expires: DateTime<Utc>) {
        self.verification_token = Some(digest);
        self.verification_token_expires = Some(expires);
    }

    pub fn mark_email_verified(&mut self) {
        self.is_email_verified = true;
        self.verification_token = None;
        self.verification_token_expires = None;
        self.touch();
    }

    pub fn set_reset_token(&mut self, digest: String, expires: DateTime<Utc>) {
        self.reset_password_token = Some(digest);
        self.reset_password_expires = Some(expires);
        self.touch();
    }

    pub fn set_password(&mut self, password_hash: String) {
        self.password_hash = password_hash;
        self.reset_password_token = None;
        self.reset_password_expires = None;
        self.touch();
    }

    /// Email notifications are on unless `preferences.notifications.email` is `false`
    pub fn wants_email(&self) -> bool {
        self.preferences
            .pointer("/notifications/email")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn merge_preferences(&mut self, patch: Value) {
        if !self.preferences.is_object() {
            self.preferences = empty_object();
        }
        deep_merge(&mut self.preferences, patch);
        self.touch();
    }

    /// Fields a user may change on their own profile
    pub fn apply_profile(&mut self, req: &UpdateUserRequest) {
        if let Some(name) = &req.name {
            self.name = name.trim().to_string();
        }
        if req.phone.is_some() {
            self.phone = clean_text(req.phone.clone());
        }
        self.touch();
    }

    /// Fields reserved to administrators
    pub fn apply_admin(&mut self, req: &UpdateUserRequest) {
        self.apply_profile(req);
        if let Some(role) = req.role {
            self.role = role;
        }
        if req.unit_id.is_some() {
            self.unit_id = req.unit_id;
        }
        if let Some(active) = req.is_active {
            self.is_active = active;
        }
    }
}

fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
    if allowed && (8..=15).contains(&digits) {
        Ok(())
    } else {
        Err(rule_error("phone", "Nomor telepon tidak valid"))
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Nama harus 2-100 karakter"))]
    pub name: Option<String>,

    #[validate(email(message = "Format email tidak valid"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password minimal 6 karakter"))]
    pub password: String,

    pub tenant_code: Option<String>,
}

impl RequestSchema for RegisterRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Format email tidak valid"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password wajib diisi"))]
    pub password: String,
}

impl RequestSchema for LoginRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Format email tidak valid"))]
    pub email: String,
}

impl RequestSchema for ForgotPasswordRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, max = 128, message = "Password minimal 6 karakter"))]
    pub password: String,
}

impl RequestSchema for ResetPasswordRequest {}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Password saat ini wajib diisi"))]
    pub current_password: String,

    #[validate(length(min = 6, max = 128, message = "Password baru minimal 6 karakter"))]
    pub new_password: String,
}

impl RequestSchema for ChangePasswordRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        if self.current_password == self.new_password {
            errors.add(
                "newPassword",
                rule_error("same_password", "Password baru harus berbeda dari password saat ini"),
            );
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 2, max = 100, message = "Nama harus 2-100 karakter"))]
    pub name: String,

    #[validate(email(message = "Format email tidak valid"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password minimal 6 karakter"))]
    pub password: String,

    #[serde(default)]
    pub role: Role,

    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,

    pub unit_id: Option<Uuid>,
}

impl RequestSchema for CreateUserRequest {}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 100, message = "Nama harus 2-100 karakter"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,

    pub role: Option<Role>,
    pub unit_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn touches_admin_fields(&self) -> bool {
        self.role.is_some() || self.unit_id.is_some() || self.is_active.is_some()
    }
}

impl RequestSchema for UpdateUserRequest {}
