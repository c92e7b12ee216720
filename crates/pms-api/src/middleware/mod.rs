//! Request middleware

pub mod auth;
pub mod errors;

pub use auth::{require_auth, AuthUser};
pub use errors::log_server_errors;
