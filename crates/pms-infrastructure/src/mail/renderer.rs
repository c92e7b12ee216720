//! Handlebars rendering for notification emails

use handlebars::Handlebars;
use serde_json::{json, Value};

use pms_core::notification::{MailError, Notification, Template};

use super::templates::{body, LAYOUT};

const LAYOUT_NAME: &str = "layout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub html: String,
}

/// Every template is compiled once at startup; a broken template fails
/// construction instead of the first send.
#[derive(Debug, Clone)]
pub struct MailRenderer {
    handlebars: Handlebars<'static>,
    app_name: String,
    frontend_url: String,
}

impl MailRenderer {
    pub fn new(app_name: &str, frontend_url: &str) -> Result<Self, MailError> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string(LAYOUT_NAME, LAYOUT)
            .map_err(|e| MailError::Render(e.to_string()))?;
        for template in Template::ALL {
            handlebars
                .register_template_string(template.name(), body(*template))
                .map_err(|e| MailError::Render(format!("{}: {}", template.name(), e)))?;
        }

        Ok(Self {
            handlebars,
            app_name: app_name.to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn render(&self, notification: &Notification) -> Result<RenderedMail, MailError> {
        let subject = notification.template.subject().to_string();
        let mut data = json!({
            "name": notification.recipient.name,
            "appName": self.app_name,
            "frontendUrl": self.frontend_url,
            "subject": subject,
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut data, &notification.context) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }

        let inner = self
            .handlebars
            .render(notification.template.name(), &data)
            .map_err(|e| MailError::Render(e.to_string()))?;
        if let Value::Object(map) = &mut data {
            map.insert("body".to_string(), Value::String(inner));
        }
        let html = self
            .handlebars
            .render(LAYOUT_NAME, &data)
            .map_err(|e| MailError::Render(e.to_string()))?;

        Ok(RenderedMail { subject, html })
    }
}
