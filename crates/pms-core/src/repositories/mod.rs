//! Repository ports

pub mod document_store;
pub mod repository;

pub use document_store::{DocumentRecord, DocumentStore, NumericSummary};
pub use repository::{Page, Repository};
