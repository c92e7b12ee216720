//! Value types shared by several entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User role enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    #[default]
    Resident,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::Resident => "resident",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "staff" => Some(Role::Staff),
            "resident" => Some(Role::Resident),
            _ => None,
        }
    }

    pub fn is_any(&self, roles: &[Role]) -> bool {
        roles.contains(self)
    }
}

pub const ALL_ROLES: &[Role] = &[Role::Admin, Role::Manager, Role::Staff, Role::Resident];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const MANAGEMENT: &[Role] = &[Role::Admin, Role::Manager];
pub const OPERATIONS: &[Role] = &[Role::Admin, Role::Manager, Role::Staff];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

pub const PRIORITY_VALUES: &[&str] = &["low", "medium", "high", "urgent"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Repeat schedule for announcements and maintenance tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub frequency: Frequency,

    #[serde(default = "default_interval")]
    #[validate(range(min = 1, max = 365, message = "Interval harus antara 1 dan 365"))]
    pub interval: u32,

    pub until: Option<DateTime<Utc>>,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 3, max = 200, message = "Alamat jalan harus 3-200 karakter"))]
    pub street: String,

    #[validate(length(min = 2, max = 100, message = "Kota harus 2-100 karakter"))]
    pub city: String,

    #[validate(length(max = 100, message = "Provinsi terlalu panjang"))]
    pub state: Option<String>,

    #[validate(length(max = 20, message = "Kode pos terlalu panjang"))]
    pub postal_code: Option<String>,

    #[serde(default = "default_country")]
    #[validate(length(min = 2, max = 100, message = "Negara harus 2-100 karakter"))]
    pub country: String,
}

fn default_country() -> String {
    "Indonesia".to_string()
}

/// Trim optional free text, mapping blank input to `None`
pub fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
