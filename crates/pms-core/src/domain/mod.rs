//! Domain entities

pub mod announcement;
pub mod common;
pub mod complaint;
pub mod maintenance;
pub mod payment;
pub mod property;
pub mod tenant;
pub mod unit;
pub mod user;

pub use announcement::{Announcement, Audience};
pub use common::{Address, Priority, Recurrence, Role};
pub use complaint::{Complaint, ComplaintStatus};
pub use maintenance::{Maintenance, MaintenanceStatus};
pub use payment::{Payment, PaymentStatus};
pub use property::Property;
pub use tenant::{SubscriptionPlan, SubscriptionStatus, Tenant};
pub use unit::{Unit, UnitStatus};
pub use user::User;
