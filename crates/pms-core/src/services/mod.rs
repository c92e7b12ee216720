//! Application services

pub mod auth_service;

pub use auth_service::{AuthOutcome, AuthService, AuthSettings, OnboardOutcome};
