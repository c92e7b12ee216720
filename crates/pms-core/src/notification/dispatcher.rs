//! Notification dispatcher

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use super::{Mailer, Notification};
use pms_shared::utils::mask_email;

#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Send all notifications concurrently and wait for them. Failures are
    /// logged; the number delivered is returned.
    pub async fn dispatch(&self, notifications: Vec<Notification>) -> usize {
        if notifications.is_empty() {
            return 0;
        }

        let sends = notifications.iter().map(|n| self.mailer.send(n));
        let results = join_all(sends).await;

        let mut delivered = 0;
        for (notification, result) in notifications.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    template = notification.template.name(),
                    to = %mask_email(&notification.recipient.email),
                    error = %e,
                    "notification delivery failed"
                ),
            }
        }
        info!(delivered, total = notifications.len(), "notifications dispatched");
        delivered
    }
}
