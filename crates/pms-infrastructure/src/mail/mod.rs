//! Email rendering and delivery

pub mod log_mailer;
pub mod renderer;
pub mod smtp;
mod templates;

pub use log_mailer::{LogMailer, SentMail};
pub use renderer::{MailRenderer, RenderedMail};
pub use smtp::SmtpMailer;
