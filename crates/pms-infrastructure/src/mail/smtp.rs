//! SMTP delivery through lettre

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use pms_core::notification::{MailError, Mailer, Notification};
use pms_shared::config::MailSettings;
use pms_shared::utils::mask_email;

use super::MailRenderer;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    renderer: MailRenderer,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings, renderer: MailRenderer) -> Result<Self, MailError> {
        let transport = if settings.username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .port(settings.port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
                .port(settings.port)
                .credentials(Credentials::new(
                    settings.username.clone(),
                    settings.password.clone(),
                ))
                .build()
        };

        let address: Address = settings
            .from_email
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

        Ok(Self {
            transport,
            from: Mailbox::new(Some(settings.from_name.clone()), address),
            renderer,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        let rendered = self.renderer.render(notification)?;
        let to: Address = notification
            .recipient
            .email
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(notification.recipient.name.clone()), to))
            .subject(rendered.subject)
            .header(ContentType::TEXT_HTML)
            .body(rendered.html)
            .map_err(|e| MailError::Transport(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        debug!(
            template = notification.template.name(),
            to = %mask_email(&notification.recipient.email),
            "email sent"
        );
        Ok(())
    }
}
