//! PostgreSQL adapters

pub mod document_store;
mod filter_sql;

pub use document_store::PgDocumentStore;
