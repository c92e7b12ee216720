//! Attachment storage adapters

pub mod local;

pub use local::LocalAttachmentStorage;
