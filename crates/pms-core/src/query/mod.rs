//! Filtered list queries

pub mod engine;
pub mod filter;
pub mod list_query;

pub use engine::{QueryEngine, SortDirection, SortKey, StoreQuery};
pub use filter::Filter;
pub use list_query::{ListQuery, Scope};
