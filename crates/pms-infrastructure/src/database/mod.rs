//! Database module (document store adapters)

pub mod connection;
pub mod memory;
pub mod postgres;

pub use connection::{create_pool, run_migrations};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
