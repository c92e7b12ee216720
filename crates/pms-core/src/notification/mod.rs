//! Outgoing notifications.
//!
//! Handlers describe the mail they want sent as [`Notification`] records; the
//! [`NotificationDispatcher`] hands them to a [`Mailer`].

pub mod dispatcher;
pub mod recipients;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use dispatcher::NotificationDispatcher;
pub use recipients::{recipients_with_roles, Recipient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    Welcome,
    VerifyEmail,
    PasswordReset,
    PasswordChanged,
    TenantOnboarded,
    SubscriptionUpdated,
    PropertyCreated,
    AnnouncementPublished,
    ComplaintCreated,
    ComplaintStatusChanged,
    ComplaintCommentAdded,
    PaymentCreated,
    PaymentStatusChanged,
    MaintenanceScheduled,
    MaintenanceAssigned,
    MaintenanceStatusChanged,
    AccountDeactivated,
    RecordRemoved,
}

impl Template {
    pub const ALL: &'static [Template] = &[
        Template::Welcome,
        Template::VerifyEmail,
        Template::PasswordReset,
        Template::PasswordChanged,
        Template::TenantOnboarded,
        Template::SubscriptionUpdated,
        Template::PropertyCreated,
        Template::AnnouncementPublished,
        Template::ComplaintCreated,
        Template::ComplaintStatusChanged,
        Template::ComplaintCommentAdded,
        Template::PaymentCreated,
        Template::PaymentStatusChanged,
        Template::MaintenanceScheduled,
        Template::MaintenanceAssigned,
        Template::MaintenanceStatusChanged,
        Template::AccountDeactivated,
        Template::RecordRemoved,
    ];

    /// Template file stem
    pub fn name(&self) -> &'static str {
        match self {
            Template::Welcome => "welcome",
            Template::VerifyEmail => "verify_email",
            Template::PasswordReset => "password_reset",
            Template::PasswordChanged => "password_changed",
            Template::TenantOnboarded => "tenant_onboarded",
            Template::SubscriptionUpdated => "subscription_updated",
            Template::PropertyCreated => "property_created",
            Template::AnnouncementPublished => "announcement_published",
            Template::ComplaintCreated => "complaint_created",
            Template::ComplaintStatusChanged => "complaint_status_changed",
            Template::ComplaintCommentAdded => "complaint_comment_added",
            Template::PaymentCreated => "payment_created",
            Template::PaymentStatusChanged => "payment_status_changed",
            Template::MaintenanceScheduled => "maintenance_scheduled",
            Template::MaintenanceAssigned => "maintenance_assigned",
            Template::MaintenanceStatusChanged => "maintenance_status_changed",
            Template::AccountDeactivated => "account_deactivated",
            Template::RecordRemoved => "record_removed",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Template::Welcome => "Selamat datang",
            Template::VerifyEmail => "Verifikasi email Anda",
            Template::PasswordReset => "Reset password",
            Template::PasswordChanged => "Password Anda telah diubah",
            Template::TenantOnboarded => "Tenant Anda siap digunakan",
            Template::SubscriptionUpdated => "Langganan diperbarui",
            Template::PropertyCreated => "Properti baru ditambahkan",
            Template::AnnouncementPublished => "Pengumuman baru",
            Template::ComplaintCreated => "Keluhan baru diterima",
            Template::ComplaintStatusChanged => "Status keluhan diperbarui",
            Template::ComplaintCommentAdded => "Komentar baru pada keluhan",
            Template::PaymentCreated => "Tagihan pembayaran baru",
            Template::PaymentStatusChanged => "Status pembayaran diperbarui",
            Template::MaintenanceScheduled => "Pemeliharaan dijadwalkan",
            Template::MaintenanceAssigned => "Tugas pemeliharaan untuk Anda",
            Template::MaintenanceStatusChanged => "Status pemeliharaan diperbarui",
            Template::AccountDeactivated => "Akun Anda dinonaktifkan",
            Template::RecordRemoved => "Data dihapus",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub template: Template,
    pub context: Value,
}

impl Notification {
    pub fn new(recipient: Recipient, template: Template, context: Value) -> Self {
        Self {
            recipient,
            template,
            context,
        }
    }

    /// Same template and context for several recipients
    pub fn fan_out(recipients: Vec<Recipient>, template: Template, context: Value) -> Vec<Self> {
        recipients
            .into_iter()
            .map(|recipient| Self::new(recipient, template, context.clone()))
            .collect()
    }
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Template render error: {0}")]
    Render(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), MailError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_names_match_serde() {
        for template in Template::ALL {
            assert_eq!(serde_json::to_value(template).unwrap(), template.name());
            assert!(!template.subject().is_empty());
        }
        assert_eq!(Template::ALL.len(), 18);
    }
}
