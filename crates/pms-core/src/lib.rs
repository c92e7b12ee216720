//! # PMS Core
//! 
//! Domain entities, the generic query engine, repository and cache ports,
//! notification dispatch, and services for the property management backend.

pub mod attachment;
pub mod cache;
pub mod domain;
pub mod entity;
pub mod error;
pub mod notification;
pub mod query;
pub mod repositories;
pub mod services;
pub mod validation;

// Re-export domain entities
pub use domain::*;
pub use entity::{Entity, EntityDescriptor};
pub use error::DomainError;
