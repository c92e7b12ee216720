//! Payment domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use pms_shared::constants::DEFAULT_CURRENCY;

use super::common::{clean_text, ADMIN_ONLY, ALL_ROLES, MANAGEMENT};
use crate::entity::{
    AccessPolicy, Distribution, Entity, EntityDescriptor, FieldKind, FilterField, Metric,
    MetricKind, Relation, StatsSpec,
};
use crate::tenant_scoped_entity;
use crate::validation::{rule_error, RequestSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Rent,
    Deposit,
    Maintenance,
    Utility,
    Penalty,
    Other,
}

pub const PAYMENT_TYPE_VALUES: &[&str] =
    &["rent", "deposit", "maintenance", "utility", "penalty", "other"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

pub const PAYMENT_STATUS_VALUES: &[&str] =
    &["pending", "completed", "failed", "refunded", "cancelled"];

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    CreditCard,
    EWallet,
}

pub const PAYMENT_METHOD_VALUES: &[&str] = &["cash", "bank_transfer", "credit_card", "e_wallet"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    #[validate(length(min = 2, max = 100, message = "Nama bank wajib diisi"))]
    pub bank_name: String,

    #[validate(length(min = 5, max = 30, message = "Nomor rekening tidak valid"))]
    pub account_number: String,

    #[validate(length(min = 2, max = 100, message = "Nama pemilik rekening wajib diisi"))]
    pub account_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    #[validate(length(min = 2, max = 30, message = "Jenis kartu wajib diisi"))]
    pub card_type: String,

    #[validate(length(equal = 4, message = "Harus 4 digit terakhir kartu"))]
    pub last4: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EWalletDetails {
    #[validate(length(min = 2, max = 50, message = "Penyedia e-wallet wajib diisi"))]
    pub provider: String,

    #[validate(length(min = 3, max = 50, message = "ID akun e-wallet wajib diisi"))]
    pub account_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub resident: Uuid,
    #[serde(rename = "type")]
    pub kind: PaymentType,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub amount: f64,
    pub currency: String,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub bank_details: Option<BankDetails>,
    pub card_details: Option<CardDetails>,
    pub e_wallet_details: Option<EWalletDetails>,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PAYMENT_DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    collection: "payments",
    label: "Pembayaran",
    owner_path: "tenantId",
    search_fields: &["reference", "description"],
    filters: &[
        FilterField::new("status", "status", FieldKind::Text),
        FilterField::new("type", "type", FieldKind::Text),
        FilterField::new("method", "method", FieldKind::Text),
        FilterField::new("unitId", "unitId", FieldKind::Uuid),
        FilterField::new("resident", "resident", FieldKind::Uuid),
        FilterField::new("currency", "currency", FieldKind::Text),
        FilterField::new("isActive", "isActive", FieldKind::Bool),
    ],
    relations: &[
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
        count_key: "totalPayments",
        distributions: &[
            Distribution {
                key: "byStatus",
                path: "status",
                values: PAYMENT_STATUS_VALUES,
            },
            Distribution {
                key: "byType",
                path: "type",
                values: PAYMENT_TYPE_VALUES,
            },
            Distribution {
                key: "byMethod",
                path: "method",
                values: PAYMENT_METHOD_VALUES,
            },
        ],
        metrics: &[
            Metric {
                key: "totalAmount",
                path: "amount",
                kind: MetricKind::Sum,
            },
            Metric {
                key: "averageAmount",
                path: "amount",
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
        stats: MANAGEMENT,
        resident_owner_path: Some("resident"),
    },
};

tenant_scoped_entity!(Payment, &PAYMENT_DESCRIPTOR);

impl Payment {
    pub fn new(tenant_id: Uuid, req: CreatePaymentRequest, attachments: Vec<String>) -> Self {
        let now = Utc::now();
        let paid_at = (req.status == PaymentStatus::Completed).then_some(now);
        let mut payment = Self {
            id: Uuid::new_v4(),
            tenant_id,
            unit_id: req.unit_id,
            resident: req.resident,
            kind: req.kind,
            status: req.status,
            method: req.method,
            amount: req.amount,
            currency: req.currency.trim().to_uppercase(),
            due_date: req.due_date,
            paid_at,
            reference: clean_text(req.reference),
            description: clean_text(req.description),
            bank_details: req.bank_details,
            card_details: req.card_details,
            e_wallet_details: req.e_wallet_details,
            attachments,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        payment.retain_method_details();
        payment
    }

    /// Keeps only the detail block that belongs to the payment method
    fn retain_method_details(&mut self) {
        if self.method != PaymentMethod::BankTransfer {
            self.bank_details = None;
        }
        if self.method != PaymentMethod::CreditCard {
            self.card_details = None;
        }
        if self.method != PaymentMethod::EWallet {
            self.e_wallet_details = None;
        }
    }

    pub fn change_status(&mut self, status: PaymentStatus, reference: Option<String>) {
        if status == PaymentStatus::Completed && self.paid_at.is_none() {
            self.paid_at = Some(Utc::now());
        }
        if reference.is_some() {
            self.reference = clean_text(reference);
        }
        self.status = status;
        self.touch();
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub unit_id: Uuid,
    pub resident: Uuid,

    #[serde(rename = "type")]
    pub kind: PaymentType,

    #[serde(default)]
    pub status: PaymentStatus,

    pub method: PaymentMethod,

    #[validate(range(exclusive_min = 0.0, message = "Jumlah pembayaran harus lebih dari 0"))]
    pub amount: f64,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Mata uang harus 3 huruf"))]
    pub currency: String,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(length(max = 100, message = "Referensi maksimal 100 karakter"))]
    pub reference: Option<String>,

    #[validate(length(max = 500, message = "Deskripsi maksimal 500 karakter"))]
    pub description: Option<String>,

    #[validate(nested)]
    pub bank_details: Option<BankDetails>,

    #[validate(nested)]
    pub card_details: Option<CardDetails>,

    #[validate(nested)]
    pub e_wallet_details: Option<EWalletDetails>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl RequestSchema for CreatePaymentRequest {
    fn rules(&self, errors: &mut ValidationErrors) {
        match self.method {
            PaymentMethod::BankTransfer if self.bank_details.is_none() => errors.add(
                "bankDetails",
                rule_error("required", "Detail bank wajib diisi untuk transfer bank"),
            ),
            PaymentMethod::CreditCard if self.card_details.is_none() => errors.add(
                "cardDetails",
                rule_error("required", "Detail kartu wajib diisi untuk kartu kredit"),
            ),
            PaymentMethod::EWallet if self.e_wallet_details.is_none() => errors.add(
                "eWalletDetails",
                rule_error("required", "Detail e-wallet wajib diisi untuk pembayaran e-wallet"),
            ),
            _ => {}
        }
        if !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.add("currency", rule_error("currency", "Mata uang harus 3 huruf"));
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentStatusRequest {
    pub status: PaymentStatus,

    #[validate(length(max = 100, message = "Referensi maksimal 100 karakter"))]
    pub reference: Option<String>,
}

impl RequestSchema for PaymentStatusRequest {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> CreatePaymentRequest {
        serde_json::from_value(body).unwrap()
    }

    fn base() -> serde_json::Value {
        json!({
            "unitId": Uuid::new_v4(),
            "resident": Uuid::new_v4(),
            "type": "rent",
            "method": "cash",
            "amount": 1500000
        })
    }

    #[test]
    fn test_defaults_currency_idr() {
        let req = request(base());
        assert!(req.check().is_ok());
        let p = Payment::new(Uuid::new_v4(), req, vec![]);
        assert_eq!(p.currency, "IDR");
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.paid_at.is_none());
    }

    #[test]
    fn test_bank_transfer_requires_bank_details() {
        let mut body = base();
        body["method"] = json!("bank_transfer");
        let err = request(body).check().unwrap_err();
        assert!(matches!(err, crate::DomainError::Validation(ref e) if e[0].field == "bankDetails"));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut body = base();
        body["amount"] = json!(0);
        assert!(request(body).check().is_err());
    }

    #[test]
    fn test_foreign_method_details_dropped() {
        let mut body = base();
        body["cardDetails"] = json!({ "cardType": "visa", "last4": "4242" });
        let p = Payment::new(Uuid::new_v4(), request(body), vec![]);
        assert!(p.card_details.is_none());
    }

    #[test]
    fn test_completing_sets_paid_at() {
        let mut p = Payment::new(Uuid::new_v4(), request(base()), vec![]);
        p.change_status(PaymentStatus::Completed, Some("TRX-1".into()));
        assert!(p.paid_at.is_some());
        assert_eq!(p.reference.as_deref(), Some("TRX-1"));
    }

    #[test]
    fn test_e_wallet_key_is_camel_case() {
        let mut body = base();
        body["method"] = json!("e_wallet");
        body["eWalletDetails"] = json!({ "provider": "OVO", "accountId": "0812345" });
        let p = Payment::new(Uuid::new_v4(), request(body), vec![]);
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["eWalletDetails"]["provider"], "OVO");
        for status in [PaymentStatus::Pending, PaymentStatus::Refunded] {
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
    }
}
