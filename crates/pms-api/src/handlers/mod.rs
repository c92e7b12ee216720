pub mod announcements;
pub mod auth;
pub mod complaints;
pub mod health;
pub mod maintenance;
pub mod payments;
pub mod properties;
pub mod resource;
pub mod tenants;
pub mod units;
pub mod users;
