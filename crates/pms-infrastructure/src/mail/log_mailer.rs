//! Mailer that renders and records instead of delivering.
//!
//! Used when SMTP is disabled and by the API tests, which inspect
//! [`LogMailer::sent`].

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use pms_core::notification::{MailError, Mailer, Notification, Template};
use pms_shared::utils::mask_email;

use super::MailRenderer;

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub template: Template,
    pub subject: String,
    pub html: String,
}

pub struct LogMailer {
    renderer: MailRenderer,
    sent: Mutex<Vec<SentMail>>,
}

impl LogMailer {
    pub fn new(renderer: MailRenderer) -> Self {
        Self {
            renderer,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn sent_to(&self, email: &str) -> Vec<SentMail> {
        self.sent().into_iter().filter(|m| m.to == email).collect()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        let rendered = self.renderer.render(notification)?;
        info!(
            template = notification.template.name(),
            to = %mask_email(&notification.recipient.email),
            subject = %rendered.subject,
            "email (log only)"
        );
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(SentMail {
                to: notification.recipient.email.clone(),
                template: notification.template,
                subject: rendered.subject,
                html: rendered.html,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pms_core::notification::Recipient;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_rendered_mail() {
        let mailer = LogMailer::new(MailRenderer::new("PMS", "http://app.test").unwrap());
        let notification = Notification::new(
            Recipient {
                email: "a@x.com".into(),
                name: "A".into(),
            },
            Template::PasswordChanged,
            json!({}),
        );
        mailer.send(&notification).await.unwrap();

        let sent = mailer.sent_to("a@x.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template, Template::PasswordChanged);
        assert!(mailer.sent_to("b@x.com").is_empty());
    }
}
